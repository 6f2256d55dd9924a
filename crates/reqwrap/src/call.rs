//! The dispatcher: one invocation over three native calling shapes.
//!
//! Native libraries initiate requests through functions that come in three
//! variants that can not all be invoked the same way:
//!
//! - `status = fn(loop, record, args, completion)`
//! - `status = fn(record, args, completion)`
//! - `fn(record, args, completion)` with no return value
//!
//! [`NativeCall`] presents them uniformly to [`ReqWrap::dispatch`]
//! (crate::ReqWrap::dispatch). The shape is picked by trait resolution
//! against the supplied function pointer's static type, with no runtime
//! branching. The void shape is normalized to status 0, since such
//! functions are defined never to fail synchronously.

use reqwrap_core::args::Verbatim;
use reqwrap_core::nloop::NativeLoop;
use reqwrap_core::record::Record;

use crate::trampoline::Completion;

/// Shape (a): `status = fn(loop, record, args, completion)`.
pub type NativeFnLoop<T, A> = fn(&dyn NativeLoop, &mut T, A, Completion<T>) -> i32;

/// Shape (b): `status = fn(record, args, completion)`.
pub type NativeFnRet<T, A> = fn(&mut T, A, Completion<T>) -> i32;

/// Shape (c): `fn(record, args, completion)`, never fails synchronously.
pub type NativeFnVoid<T, A> = fn(&mut T, A, Completion<T>);

/// Uniform invocation over the three native calling shapes.
///
/// The loop handle is supplied only to the shape that declares it; the
/// verbatim arguments and the completion pass through unchanged.
///
/// A completion callback cannot ride along in the verbatim argument
/// position; the build fails naming the offending type:
///
/// ```compile_fail
/// use std::rc::Rc;
/// use reqwrap::{Completion, NativeFnRet, ReqWrap};
/// use reqwrap_core::{Record, ReqId};
///
/// struct EchoReq {
///     data: ReqId,
/// }
///
/// impl Record for EchoReq {
///     type Payload = i64;
///     const NAME: &'static str = "echo";
///     fn req_data(&self) -> ReqId {
///         self.data
///     }
///     fn set_req_data(&mut self, id: ReqId) {
///         self.data = id;
///     }
/// }
///
/// fn echo_start(
///     _rec: &mut EchoReq,
///     _args: (Completion<EchoReq>,),
///     done: Completion<EchoReq>,
/// ) -> i32 {
///     done.fire(0);
///     0
/// }
///
/// fn smuggle(wrap: &Rc<ReqWrap<EchoReq>>, stray: Completion<EchoReq>) {
///     // error[E0277]: the trait bound `Completion<EchoReq>: Verbatim`
///     // is not satisfied
///     wrap.dispatch(
///         echo_start as NativeFnRet<EchoReq, (Completion<EchoReq>,)>,
///         (stray,),
///         |_rec, _payload| {},
///     );
/// }
/// ```
pub trait NativeCall<T: Record, A: Verbatim> {
    fn invoke(self, lp: &dyn NativeLoop, record: &mut T, args: A, done: Completion<T>) -> i32;
}

impl<T: Record, A: Verbatim> NativeCall<T, A> for NativeFnLoop<T, A> {
    #[inline]
    fn invoke(self, lp: &dyn NativeLoop, record: &mut T, args: A, done: Completion<T>) -> i32 {
        self(lp, record, args, done)
    }
}

impl<T: Record, A: Verbatim> NativeCall<T, A> for NativeFnRet<T, A> {
    #[inline]
    fn invoke(self, _lp: &dyn NativeLoop, record: &mut T, args: A, done: Completion<T>) -> i32 {
        self(record, args, done)
    }
}

impl<T: Record, A: Verbatim> NativeCall<T, A> for NativeFnVoid<T, A> {
    #[inline]
    fn invoke(self, _lp: &dyn NativeLoop, record: &mut T, args: A, done: Completion<T>) -> i32 {
        self(record, args, done);
        0
    }
}

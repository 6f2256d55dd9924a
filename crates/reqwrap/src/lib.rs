//! # reqwrap
//!
//! Managed wrappers for single outstanding asynchronous operations issued
//! to an event-driven native I/O library.
//!
//! A [`ReqWrap`] owns one native request record, dispatches it through one
//! of three incompatible native calling shapes (see [`NativeCall`]),
//! intercepts the completion with a [`Completion`] trampoline to recover
//! the wrapper, keeps the wrapper alive exactly while a dispatch is
//! outstanding, maintains the environment-wide waiting counter, and then
//! re-invokes the original typed callback.
//!
//! One [`Env`] corresponds to one event loop; a single thread drives
//! construction, dispatch and completion for all wrappers under it, so
//! the state here is `Rc`/`RefCell` based and lock-free.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use reqwrap::{Env, ReqWrap, NativeFnRet};
//! use reqwrap_sim::{SimLoop, SimHandle, PostReq, post_start};
//!
//! let lp = SimLoop::new();
//! let env = Env::new(lp.clone());
//! env.finish_bootstrap();
//!
//! let wrap = ReqWrap::new(&env, PostReq::new());
//! let got = Rc::new(Cell::new(0i64));
//! let got2 = got.clone();
//! let h = SimHandle::new(&lp);
//! let status = wrap.dispatch(
//!     post_start as NativeFnRet<PostReq, (&SimHandle, i64)>,
//!     (&h, 7),
//!     move |_rec, payload| got2.set(payload),
//! );
//! assert_eq!(status, 0);
//! lp.run_while_waiting(&env);
//! assert_eq!(got.get(), 7);
//! ```

pub mod call;
pub mod env;
pub mod registry;
pub mod trampoline;
pub mod wrap;

// Re-exports for convenience
pub use call::{NativeCall, NativeFnLoop, NativeFnRet, NativeFnVoid};
pub use env::Env;
pub use registry::AnyRequest;
pub use trampoline::Completion;
pub use wrap::ReqWrap;

pub use reqwrap_core::{NativeLoop, Record, ReqId, Verbatim};

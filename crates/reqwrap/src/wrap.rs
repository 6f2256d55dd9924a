//! The request wrapper.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use reqwrap_core::args::Verbatim;
use reqwrap_core::id::ReqId;
use reqwrap_core::record::Record;
use reqwrap_core::wtrace;

use crate::call::NativeCall;
use crate::env::Env;
use crate::registry::AnyRequest;
use crate::trampoline::Completion;

type PendingCallback<T> = Box<dyn FnOnce(&mut T, <T as Record>::Payload)>;

/// Managed wrapper around one embedded native request record.
///
/// Supports at most one outstanding dispatch at a time. While a dispatch
/// is outstanding the environment's rooting table owns the wrapper, so it
/// stays alive for the native library to complete into even if every
/// external handle is dropped; idle wrappers are reclaimed as soon as the
/// last external `Rc` goes away.
pub struct ReqWrap<T: Record> {
    env: Rc<Env>,
    id: ReqId,
    me: Weak<ReqWrap<T>>,
    record: RefCell<T>,
    /// At most one stored original callback; consumed by the trampoline.
    pending: RefCell<Option<PendingCallback<T>>>,
}

impl<T: Record> ReqWrap<T> {
    /// Construct and register with the environment.
    ///
    /// Panics if the environment has not finished bootstrapping.
    pub fn new(env: &Rc<Env>, record: T) -> Rc<Self> {
        assert!(
            env.has_bootstrapped(),
            "request wrapper constructed before environment bootstrap completed"
        );
        let wrap = Rc::new_cyclic(|me: &Weak<ReqWrap<T>>| {
            let erased: Weak<dyn AnyRequest> = me.clone();
            let id = env.registry().insert(erased);
            ReqWrap {
                env: env.clone(),
                id,
                me: me.clone(),
                record: RefCell::new(record),
                pending: RefCell::new(None),
            }
        });
        wrap.reset();
        wtrace!("{}: {} constructed", T::NAME, wrap.id);
        wrap
    }

    /// Clear the stored callback and the record's back-reference.
    ///
    /// Required before reusing a wrapper whose prior dispatch has fully
    /// completed or was rejected. Must not be called while a dispatch is
    /// outstanding, nor from inside a completion callback (the record is
    /// mutably borrowed there).
    pub fn reset(&self) {
        debug_assert!(!self.in_flight(), "reset with dispatch outstanding");
        *self.pending.borrow_mut() = None;
        self.record.borrow_mut().set_req_data(ReqId::NONE);
    }

    /// Hand the record to a native function together with a completion
    /// trampoline, storing `cb` to be re-invoked when the trampoline
    /// fires.
    ///
    /// Returns the native status unchanged. Negative means synchronous
    /// rejection: no completion will ever be delivered for this attempt,
    /// and neither rooting nor the waiting counter change (call `reset`
    /// before retrying). Non-negative means accepted: the wrapper is
    /// rooted strongly and the waiting counter incremented until the
    /// trampoline fires.
    ///
    /// Panics if a stored callback from a previous dispatch has not been
    /// consumed or reset. Issuing a second dispatch while one is
    /// outstanding is a contract violation (checked in debug builds only).
    pub fn dispatch<F, A, C>(&self, f: F, args: A, cb: C) -> i32
    where
        F: NativeCall<T, A>,
        A: Verbatim,
        C: FnOnce(&mut T, T::Payload) + 'static,
    {
        debug_assert!(!self.in_flight(), "dispatch while a dispatch is outstanding");

        // Associate record and wrapper.
        self.record.borrow_mut().set_req_data(self.id);

        {
            let mut pending = self.pending.borrow_mut();
            assert!(
                pending.is_none(),
                "{}: second completion callback stored before the first was consumed",
                T::NAME
            );
            *pending = Some(Box::new(cb));
        }

        let done = Completion::new(&self.env, self.id);
        let status = {
            let mut record = self.record.borrow_mut();
            f.invoke(self.env.event_loop(), &mut *record, args, done)
        };

        if status >= 0 {
            let strong = self.me.upgrade().expect("wrapper freed during dispatch");
            self.env.root(self.id, strong);
            self.env.increase_waiting();
            wtrace!("{}: {} dispatched, {} waiting", T::NAME, self.id, self.env.waiting_requests());
        } else {
            wtrace!("{}: {} rejected synchronously ({})", T::NAME, self.id, status);
        }
        status
    }

    /// Issue the native cooperative cancel, but only if a dispatch has
    /// been associated with the record; otherwise a no-op with no native
    /// call. Advisory: the completion may still deliver a normal result
    /// or a cancellation-specific result code; both are valid.
    pub fn cancel(&self) -> i32 {
        if self.record.borrow().req_data() == self.id {
            self.env.event_loop().cancel(self.id)
        } else {
            0
        }
    }

    /// Recover a wrapper from its id.
    ///
    /// Panics if the id is stale or belongs to a wrapper of a different
    /// record type. Inside the trampoline both are impossible by
    /// construction: the rooting table keeps the wrapper alive and the
    /// completion is monomorphized per record type.
    pub fn from_id(env: &Env, id: ReqId) -> Rc<Self> {
        let req = env
            .registry()
            .get(id)
            .expect("request id not registered or wrapper already dropped");
        req.as_any_rc()
            .downcast::<ReqWrap<T>>()
            .ok()
            .expect("request record type mismatch")
    }

    #[inline]
    pub fn id(&self) -> ReqId {
        self.id
    }

    #[inline]
    pub fn env(&self) -> &Rc<Env> {
        &self.env
    }

    /// Whether a dispatch is currently outstanding.
    #[inline]
    pub fn in_flight(&self) -> bool {
        self.env.is_rooted(self.id)
    }

    /// Borrow the record. Panics if called from inside a completion
    /// callback, where the record is mutably borrowed.
    pub fn record(&self) -> Ref<'_, T> {
        self.record.borrow()
    }

    pub(crate) fn record_mut(&self) -> RefMut<'_, T> {
        self.record.borrow_mut()
    }

    pub(crate) fn take_pending(&self) -> Option<PendingCallback<T>> {
        self.pending.borrow_mut().take()
    }
}

impl<T: Record> AnyRequest for ReqWrap<T> {
    fn id(&self) -> ReqId {
        self.id
    }

    fn name(&self) -> &'static str {
        T::NAME
    }

    fn in_flight(&self) -> bool {
        self.env.is_rooted(self.id)
    }

    fn as_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwrap_core::nloop::NativeLoop;
    use std::cell::Cell;

    struct NopLoop;

    impl NativeLoop for NopLoop {
        fn cancel(&self, _req: ReqId) -> i32 {
            0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn test_env() -> Rc<Env> {
        let env = Env::new(Rc::new(NopLoop));
        env.finish_bootstrap();
        env
    }

    /// Record that stashes its completion, the way a native library
    /// stores the callback on the request struct; tests pull it out and
    /// fire it to play the library's part.
    struct EchoReq {
        data: ReqId,
        armed: Option<Completion<EchoReq>>,
    }

    impl EchoReq {
        fn new() -> Self {
            Self {
                data: ReqId::NONE,
                armed: None,
            }
        }
    }

    impl Record for EchoReq {
        type Payload = i64;
        const NAME: &'static str = "echo";

        fn req_data(&self) -> ReqId {
            self.data
        }

        fn set_req_data(&mut self, id: ReqId) {
            self.data = id;
        }
    }

    fn echo_start(rec: &mut EchoReq, (): (), done: Completion<EchoReq>) -> i32 {
        rec.armed = Some(done);
        0
    }

    fn echo_reject(_rec: &mut EchoReq, (status,): (i32,), _done: Completion<EchoReq>) -> i32 {
        status
    }

    fn arm(wrap: &Rc<ReqWrap<EchoReq>>) -> Completion<EchoReq> {
        wrap.record_mut().armed.take().expect("not armed")
    }

    #[test]
    #[should_panic(expected = "bootstrap")]
    fn test_construct_before_bootstrap_panics() {
        let env = Env::new(Rc::new(NopLoop));
        let _ = ReqWrap::new(&env, EchoReq::new());
    }

    #[test]
    fn test_construct_registers_and_starts_idle() {
        let env = test_env();
        let wrap = ReqWrap::new(&env, EchoReq::new());
        assert_eq!(wrap.id(), ReqId::new(0));
        assert_eq!(env.request_count(), 1);
        assert!(!wrap.in_flight());
        assert_eq!(wrap.record().req_data(), ReqId::NONE);
    }

    #[test]
    fn test_dispatch_roots_and_counts() {
        let env = test_env();
        let wrap = ReqWrap::new(&env, EchoReq::new());
        let status = wrap.dispatch(
            echo_start as crate::NativeFnRet<EchoReq, ()>,
            (),
            |_rec, _payload| {},
        );
        assert_eq!(status, 0);
        assert!(wrap.in_flight());
        assert_eq!(env.waiting_requests(), 1);
        assert_eq!(wrap.record().req_data(), wrap.id());
    }

    #[test]
    fn test_fire_unroots_decrements_and_invokes() {
        let env = test_env();
        let wrap = ReqWrap::new(&env, EchoReq::new());
        let got = Rc::new(Cell::new(0i64));
        let got2 = got.clone();
        wrap.dispatch(
            echo_start as crate::NativeFnRet<EchoReq, ()>,
            (),
            move |_rec, payload| got2.set(payload),
        );
        let done = arm(&wrap);
        done.fire(42);
        assert_eq!(got.get(), 42);
        assert!(!wrap.in_flight());
        assert_eq!(env.waiting_requests(), 0);
        // Association persists until the next reset or dispatch.
        assert_eq!(wrap.record().req_data(), wrap.id());
        let again = ReqWrap::<EchoReq>::from_id(&env, wrap.id());
        assert!(Rc::ptr_eq(&wrap, &again));
    }

    #[test]
    fn test_rejected_dispatch_leaves_state_untouched() {
        let env = test_env();
        let wrap = ReqWrap::new(&env, EchoReq::new());
        let status = wrap.dispatch(
            echo_reject as crate::NativeFnRet<EchoReq, (i32,)>,
            (-22,),
            |_rec, _payload| {},
        );
        assert_eq!(status, -22);
        assert!(!wrap.in_flight());
        assert_eq!(env.waiting_requests(), 0);
    }

    #[test]
    #[should_panic(expected = "second completion callback")]
    fn test_second_stored_callback_panics() {
        let env = test_env();
        let wrap = ReqWrap::new(&env, EchoReq::new());
        // Rejected dispatch leaves the callback stored until reset.
        wrap.dispatch(
            echo_reject as crate::NativeFnRet<EchoReq, (i32,)>,
            (-22,),
            |_rec, _payload| {},
        );
        wrap.dispatch(
            echo_reject as crate::NativeFnRet<EchoReq, (i32,)>,
            (-22,),
            |_rec, _payload| {},
        );
    }

    #[test]
    fn test_reset_clears_for_reuse() {
        let env = test_env();
        let wrap = ReqWrap::new(&env, EchoReq::new());
        wrap.dispatch(
            echo_reject as crate::NativeFnRet<EchoReq, (i32,)>,
            (-22,),
            |_rec, _payload| {},
        );
        wrap.reset();
        assert_eq!(wrap.record().req_data(), ReqId::NONE);
        let status = wrap.dispatch(
            echo_start as crate::NativeFnRet<EchoReq, ()>,
            (),
            |_rec, _payload| {},
        );
        assert_eq!(status, 0);
        arm(&wrap).fire(0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let env = test_env();
        let wrap = ReqWrap::new(&env, EchoReq::new());
        wrap.reset();
        wrap.reset();
        assert_eq!(wrap.record().req_data(), ReqId::NONE);
    }

    #[test]
    fn test_rooting_outlives_external_handles() {
        let env = test_env();
        let got = Rc::new(Cell::new(0i64));
        let got2 = got.clone();
        let done = {
            let wrap = ReqWrap::new(&env, EchoReq::new());
            wrap.dispatch(
                echo_start as crate::NativeFnRet<EchoReq, ()>,
                (),
                move |_rec, payload| got2.set(payload),
            );
            arm(&wrap)
        };
        // External handle gone; the rooting table keeps it alive.
        let mut live = 0;
        env.for_each_request(|_| live += 1);
        assert_eq!(live, 1);
        done.fire(7);
        assert_eq!(got.get(), 7);
        // Weak again and unreferenced: reclaimed.
        let mut live = 0;
        env.for_each_request(|_| live += 1);
        assert_eq!(live, 0);
        assert_eq!(env.waiting_requests(), 0);
    }

    #[test]
    #[should_panic(expected = "record type mismatch")]
    fn test_from_id_mismatched_type_panics() {
        struct OtherReq {
            data: ReqId,
        }
        impl Record for OtherReq {
            type Payload = ();
            const NAME: &'static str = "other";
            fn req_data(&self) -> ReqId {
                self.data
            }
            fn set_req_data(&mut self, id: ReqId) {
                self.data = id;
            }
        }

        let env = test_env();
        let wrap = ReqWrap::new(&env, EchoReq::new());
        let _ = ReqWrap::<OtherReq>::from_id(&env, wrap.id());
    }

    #[test]
    fn test_registry_enumeration_in_construction_order() {
        let env = test_env();
        let _a = ReqWrap::new(&env, EchoReq::new());
        let _b = ReqWrap::new(&env, EchoReq::new());
        let _c = ReqWrap::new(&env, EchoReq::new());
        assert_eq!(env.request_count(), 3);
        let mut ids = Vec::new();
        env.for_each_request(|req| ids.push(req.id().as_u32()));
        assert_eq!(ids, vec![0, 1, 2]);
    }
}

//! Completion interception.
//!
//! A [`Completion`] is the token the dispatcher hands to the native
//! library in place of the user's callback; one monomorphization exists
//! per record type. When the native library fires it, the owning wrapper
//! is recovered through the registry, its rooting drops back to weak, the
//! waiting counter decrements, and the stored original callback runs with
//! the record and the untouched native payload.

use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use reqwrap_core::id::ReqId;
use reqwrap_core::record::Record;
use reqwrap_core::wtrace;

use crate::env::Env;
use crate::wrap::ReqWrap;

/// Trampoline token for one dispatched request.
///
/// Fired at most once (consumed by value), always on the loop thread, and
/// never re-entrantly from inside the initiating native call. A dropped
/// completion leaks the request's rooting and counter slot, so native
/// libraries must either fire it or reject the dispatch synchronously.
pub struct Completion<T: Record> {
    req: ReqId,
    env: Weak<Env>,
    _record: PhantomData<fn(T)>,
}

impl<T: Record> Completion<T> {
    pub(crate) fn new(env: &Rc<Env>, req: ReqId) -> Self {
        Self {
            req,
            env: Rc::downgrade(env),
            _record: PhantomData,
        }
    }

    /// Id of the request this completion belongs to.
    #[inline]
    pub fn req(&self) -> ReqId {
        self.req
    }

    /// Deliver the native result and re-invoke the stored user callback.
    ///
    /// The record stays associated with its wrapper afterwards (lookups
    /// keep resolving) until the next `reset` or `dispatch`. The user
    /// callback gets the record mutably borrowed, so it must not call
    /// `reset` or re-dispatch this wrapper from inside; do that after the
    /// loop turn.
    pub fn fire(self, payload: T::Payload) {
        let env = self
            .env
            .upgrade()
            .expect("completion fired after environment teardown");
        // Temporary strong hold for the rest of this invocation.
        let wrap = ReqWrap::<T>::from_id(&env, self.req);
        env.unroot(self.req);
        env.decrease_waiting();
        wtrace!("{}: {} completed, {} still waiting", T::NAME, self.req, env.waiting_requests());
        let cb = wrap
            .take_pending()
            .expect("completion fired with no stored callback");
        let mut record = wrap.record_mut();
        cb(&mut *record, payload);
    }
}

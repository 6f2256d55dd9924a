//! Environment: loop handle, waiting counter, registry, rooting table.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use reqwrap_core::id::ReqId;
use reqwrap_core::nloop::NativeLoop;
use reqwrap_core::{wdebug, winfo};

use crate::registry::{AnyRequest, Registry};

/// One environment per event loop.
///
/// Owns the native loop handle, the waiting-operations counter, the
/// request registry and the outstanding-operations table that keeps a
/// wrapper alive while its dispatch is in flight. Driven by a single
/// thread; no internal locking.
pub struct Env {
    lp: Rc<dyn NativeLoop>,
    bootstrapped: Cell<bool>,
    waiting: Cell<u64>,
    registry: Registry,
    /// Strong rooting: an entry owns its wrapper for exactly the span
    /// between an accepted dispatch and the trampoline firing.
    outstanding: RefCell<HashMap<ReqId, Rc<dyn AnyRequest>>>,
}

impl Env {
    pub fn new(lp: Rc<dyn NativeLoop>) -> Rc<Self> {
        Rc::new(Self {
            lp,
            bootstrapped: Cell::new(false),
            waiting: Cell::new(0),
            registry: Registry::new(),
            outstanding: RefCell::new(HashMap::new()),
        })
    }

    /// Mark bootstrap as finished; wrappers may be constructed from here on.
    pub fn finish_bootstrap(&self) {
        self.bootstrapped.set(true);
        wdebug!("env: bootstrap complete");
    }

    #[inline]
    pub fn has_bootstrapped(&self) -> bool {
        self.bootstrapped.get()
    }

    /// The native loop handle, passed to operation functions that take one.
    #[inline]
    pub fn event_loop(&self) -> &dyn NativeLoop {
        &*self.lp
    }

    /// Accepted-but-incomplete operation count. The event loop must keep
    /// running while this is non-zero.
    #[inline]
    pub fn waiting_requests(&self) -> u64 {
        self.waiting.get()
    }

    pub fn increase_waiting(&self) {
        self.waiting.set(self.waiting.get() + 1);
    }

    pub fn decrease_waiting(&self) {
        let n = self.waiting.get();
        assert!(n > 0, "waiting counter underflow");
        self.waiting.set(n - 1);
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn root(&self, id: ReqId, req: Rc<dyn AnyRequest>) {
        let prev = self.outstanding.borrow_mut().insert(id, req);
        debug_assert!(prev.is_none(), "{} rooted twice", id);
    }

    pub(crate) fn unroot(&self, id: ReqId) {
        self.outstanding.borrow_mut().remove(&id);
    }

    pub(crate) fn is_rooted(&self, id: ReqId) -> bool {
        self.outstanding.borrow().contains_key(&id)
    }

    /// Number of wrappers ever constructed under this environment.
    pub fn request_count(&self) -> usize {
        self.registry.len()
    }

    /// Visit every live wrapper in construction order.
    pub fn for_each_request(&self, f: impl FnMut(&dyn AnyRequest)) {
        self.registry.for_each_live(f);
    }

    /// Log a one-line summary per live request.
    pub fn dump_requests(&self) {
        winfo!(
            "env: {} requests constructed, {} waiting",
            self.request_count(),
            self.waiting_requests()
        );
        self.registry.for_each_live(|req| {
            winfo!(
                "  {} {} in_flight={}",
                req.id(),
                req.name(),
                req.in_flight()
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct NopLoop;

    impl NativeLoop for NopLoop {
        fn cancel(&self, _req: ReqId) -> i32 {
            0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_counter_round_trip() {
        let env = Env::new(Rc::new(NopLoop));
        assert_eq!(env.waiting_requests(), 0);
        env.increase_waiting();
        env.increase_waiting();
        assert_eq!(env.waiting_requests(), 2);
        env.decrease_waiting();
        env.decrease_waiting();
        assert_eq!(env.waiting_requests(), 0);
    }

    #[test]
    #[should_panic(expected = "waiting counter underflow")]
    fn test_counter_underflow_panics() {
        let env = Env::new(Rc::new(NopLoop));
        env.decrease_waiting();
    }

    #[test]
    fn test_bootstrap_flag() {
        let env = Env::new(Rc::new(NopLoop));
        assert!(!env.has_bootstrapped());
        env.finish_bootstrap();
        assert!(env.has_bootstrapped());
    }
}

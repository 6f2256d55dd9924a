//! Construction-ordered request registry and handle table.
//!
//! Every wrapper constructed under an environment is appended here exactly
//! once; the entry index is the wrapper's `ReqId`. Entries are weak, so a
//! dropped wrapper simply reads as dead; nothing is ever removed by this
//! layer, which keeps ids stable for the lifetime of the environment.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use reqwrap_core::id::ReqId;

/// Type-erased view of a request wrapper, for registry enumeration and
/// trampoline recovery.
pub trait AnyRequest: 'static {
    fn id(&self) -> ReqId;

    /// Record family name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether a dispatch is currently outstanding.
    fn in_flight(&self) -> bool;

    fn as_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

pub(crate) struct Registry {
    entries: RefCell<Vec<Weak<dyn AnyRequest>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Append a wrapper; the returned id is its permanent handle.
    pub(crate) fn insert(&self, req: Weak<dyn AnyRequest>) -> ReqId {
        let mut entries = self.entries.borrow_mut();
        let id = ReqId::new(entries.len() as u32);
        entries.push(req);
        id
    }

    pub(crate) fn get(&self, id: ReqId) -> Option<Rc<dyn AnyRequest>> {
        self.entries.borrow().get(id.as_u32() as usize)?.upgrade()
    }

    /// Number of wrappers ever constructed (live or not).
    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Visit every live wrapper in construction order.
    pub(crate) fn for_each_live(&self, mut f: impl FnMut(&dyn AnyRequest)) {
        for weak in self.entries.borrow().iter() {
            if let Some(req) = weak.upgrade() {
                f(&*req);
            }
        }
    }
}

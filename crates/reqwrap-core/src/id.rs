//! Request identity type
//!
//! A `ReqId` is an index into an environment's handle table, assigned once
//! when a wrapper is constructed and never reused. It replaces the raw
//! back-pointer a native library would otherwise carry: the library only
//! ever sees the id, and completions resolve it through the registry.

use core::fmt;

/// Identity of a request wrapper within one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ReqId(u32);

impl ReqId {
    /// Sentinel meaning "no request associated".
    pub const NONE: Self = Self(u32::MAX);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for ReqId {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for ReqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "req-none")
        } else {
            write!(f, "req#{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_sentinel() {
        assert!(ReqId::NONE.is_none());
        assert!(!ReqId::new(0).is_none());
        assert_eq!(ReqId::default(), ReqId::NONE);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ReqId::new(7)), "req#7");
        assert_eq!(format!("{}", ReqId::NONE), "req-none");
    }
}

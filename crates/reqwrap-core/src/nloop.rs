//! Native event-loop interface.

use std::any::Any;

use crate::id::ReqId;

/// The handle a native I/O library exposes to this layer.
///
/// Only the cooperative cancel primitive is required here; operation
/// functions that need the concrete loop reach it through `as_any`.
pub trait NativeLoop {
    /// Best-effort cancel of an in-flight request.
    ///
    /// Cancellation is advisory: the operation may still complete with a
    /// normal result, or with a cancellation-specific result code. Both
    /// are valid outcomes the caller must accept. Returns 0 if the cancel
    /// was issued, a negative errno otherwise.
    fn cancel(&self, req: ReqId) -> i32;

    /// Downcast hook for operation functions that need the concrete loop.
    fn as_any(&self) -> &dyn Any;
}

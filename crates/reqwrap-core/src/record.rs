//! The native request record contract.

use crate::id::ReqId;

/// A native request record type.
///
/// One record is embedded by value in each wrapper and handed to the
/// native library for the duration of a dispatch. The record carries an
/// opaque back-reference slot (the `data` word a native library reserves
/// on its request structs); this layer keeps it equal to the owning
/// wrapper's `ReqId` while a dispatch is associated and `ReqId::NONE`
/// otherwise, never any other value.
pub trait Record: 'static {
    /// Result parameters the native library delivers on completion.
    type Payload: 'static;

    /// Diagnostic name of the operation family.
    const NAME: &'static str;

    /// Read the opaque back-reference slot.
    fn req_data(&self) -> ReqId;

    /// Write the opaque back-reference slot.
    fn set_req_data(&mut self, id: ReqId);
}

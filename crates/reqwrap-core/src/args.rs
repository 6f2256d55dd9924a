//! Verbatim-argument marker.
//!
//! Everything a dispatch forwards to the native call besides the record
//! and the completion travels as one tuple of `Verbatim` values. The
//! trait is implemented for plain value types and tuples of them, and
//! deliberately NOT implemented for completion tokens or function types:
//! a completion callback smuggled into the verbatim position fails the
//! build with a diagnostic naming the offending type, which is the
//! safety net against silently dropping a callback.

use std::time::Duration;

/// Marker for values forwarded unchanged through dispatch to the native
/// call.
pub trait Verbatim {}

macro_rules! verbatim_value {
    ($($t:ty),* $(,)?) => {
        $(impl Verbatim for $t {})*
    };
}

verbatim_value!(
    (), bool, char,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
    str, String, Duration,
    crate::id::ReqId,
);

impl<X: Verbatim + ?Sized> Verbatim for &X {}

impl<X: Verbatim> Verbatim for Option<X> {}

impl<X: Verbatim> Verbatim for [X] {}

impl<X: Verbatim, const N: usize> Verbatim for [X; N] {}

macro_rules! verbatim_tuple {
    ($($name:ident),+) => {
        impl<$($name: Verbatim),+> Verbatim for ($($name,)+) {}
    };
}

verbatim_tuple!(A);
verbatim_tuple!(A, B);
verbatim_tuple!(A, B, C);
verbatim_tuple!(A, B, C, D);
verbatim_tuple!(A, B, C, D, E);
verbatim_tuple!(A, B, C, D, E, F);

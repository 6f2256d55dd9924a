//! # reqwrap-core
//!
//! Core types and traits for reqwrap, the managed-wrapper layer for
//! single-shot asynchronous requests issued to an event-driven native
//! I/O library.
//!
//! This crate is backend-agnostic and carries no external dependencies.
//! The machinery (wrapper, dispatcher, trampoline) lives in `reqwrap`;
//! concrete native loops implement the interfaces defined here.
//!
//! ## Modules
//!
//! - `id` - request identity type (handle-table index)
//! - `record` - the native request record contract
//! - `args` - verbatim-argument marker trait
//! - `nloop` - native event-loop interface
//! - `wlog` - leveled stderr logging macros
//! - `env` - environment variable utilities

pub mod args;
pub mod env;
pub mod id;
pub mod nloop;
pub mod record;
pub mod wlog;

// Re-exports for convenience
pub use args::Verbatim;
pub use env::{env_get, env_get_bool};
pub use id::ReqId;
pub use nloop::NativeLoop;
pub use record::Record;

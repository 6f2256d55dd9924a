//! # reqwrap-sim
//!
//! A simulated native I/O library for exercising reqwrap: a [`SimLoop`]
//! that accepts requests synchronously, completes them asynchronously on
//! the loop thread, and supports cooperative cancel. Timed work runs on
//! an internal worker thread (the threadpool of a real library) and comes
//! back over a lock-free completion queue.
//!
//! Three operations cover the three native calling shapes:
//!
//! - [`sleep_start`] — `status = fn(loop, record, args, completion)`
//! - [`post_start`] — `status = fn(record, args, completion)`
//! - [`notify_start`] — `fn(record, args, completion)`, never fails

pub mod error;
pub mod ops;
pub mod sim_loop;

pub use error::{Result, SimError};
pub use ops::{
    notify_start, post_start, sleep_start, NotifyReq, PostReq, SleepReq, MAX_SLEEP_MS,
};
pub use sim_loop::{SimHandle, SimLoop};

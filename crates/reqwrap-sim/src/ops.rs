//! Simulated operations, one per native calling shape.
//!
//! Each record carries only the opaque back-reference slot; results are
//! delivered through the completion payload, negative errno on failure.

use std::time::Duration;

use reqwrap::Completion;
use reqwrap_core::id::ReqId;
use reqwrap_core::nloop::NativeLoop;
use reqwrap_core::record::Record;

use crate::sim_loop::{SimHandle, SimLoop};

/// Upper bound on a sleep request, in milliseconds.
pub const MAX_SLEEP_MS: u64 = 60_000;

/// Record for [`sleep_start`].
#[derive(Debug, Default)]
pub struct SleepReq {
    data: ReqId,
}

impl SleepReq {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Record for SleepReq {
    type Payload = i64;
    const NAME: &'static str = "sleep";

    fn req_data(&self) -> ReqId {
        self.data
    }

    fn set_req_data(&mut self, id: ReqId) {
        self.data = id;
    }
}

/// Record for [`post_start`].
#[derive(Debug, Default)]
pub struct PostReq {
    data: ReqId,
}

impl PostReq {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Record for PostReq {
    type Payload = i64;
    const NAME: &'static str = "post";

    fn req_data(&self) -> ReqId {
        self.data
    }

    fn set_req_data(&mut self, id: ReqId) {
        self.data = id;
    }
}

/// Record for [`notify_start`].
#[derive(Debug, Default)]
pub struct NotifyReq {
    data: ReqId,
}

impl NotifyReq {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Record for NotifyReq {
    type Payload = ();
    const NAME: &'static str = "notify";

    fn req_data(&self) -> ReqId {
        self.data
    }

    fn set_req_data(&mut self, id: ReqId) {
        self.data = id;
    }
}

/// Shape (a): `status = fn(loop, record, args, completion)`.
///
/// Sleeps `ms` milliseconds on the worker thread, then completes with 0
/// (or `-ECANCELED` if a cancel entry wins the race). Rejects `ms`
/// beyond [`MAX_SLEEP_MS`] with `-EINVAL`.
pub fn sleep_start(
    lp: &dyn NativeLoop,
    _rec: &mut SleepReq,
    (ms,): (u64,),
    done: Completion<SleepReq>,
) -> i32 {
    let sim = lp
        .as_any()
        .downcast_ref::<SimLoop>()
        .expect("sleep_start requires a SimLoop");
    if ms > MAX_SLEEP_MS {
        return -libc::EINVAL;
    }
    let req = done.req();
    if !sim.register(req, Box::new(move |result| done.fire(result))) {
        return -libc::EBUSY;
    }
    let status = sim.submit_timed(req, Duration::from_millis(ms), 0);
    if status < 0 {
        sim.unregister(req);
    }
    status
}

/// Shape (b): `status = fn(record, args, completion)`.
///
/// Completes on the next loop turn, echoing `token` as the result.
/// Rejects `i64::MIN` with `-EINVAL`.
pub fn post_start(
    _rec: &mut PostReq,
    (handle, token): (&SimHandle, i64),
    done: Completion<PostReq>,
) -> i32 {
    if token == i64::MIN {
        return -libc::EINVAL;
    }
    let sim = handle.lp();
    let req = done.req();
    if !sim.register(req, Box::new(move |result| done.fire(result))) {
        return -libc::EBUSY;
    }
    sim.push_local(req, token);
    0
}

/// Shape (c): `fn(record, args, completion)`, defined never to fail
/// synchronously. Completes on the next loop turn with a unit payload.
pub fn notify_start(_rec: &mut NotifyReq, (handle,): (&SimHandle,), done: Completion<NotifyReq>) {
    let sim = handle.lp();
    let req = done.req();
    let registered = sim.register(req, Box::new(move |_result| done.fire(())));
    debug_assert!(registered, "notify dispatched twice for {}", req);
    sim.push_local(req, 0);
}

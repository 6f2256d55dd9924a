//! The simulated native loop.
//!
//! Completions are delivered only from `run_once`/`run_while_waiting` on
//! the loop thread, never from inside an initiating call, which is the
//! same contract a real event-driven library gives its embedder. Timed jobs go
//! to a worker thread over a lock-free MPSC queue and come back as
//! `(ReqId, result)` entries, reactor-style; loop-local operations queue
//! their entries directly.

use std::any::Any;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_queue::ArrayQueue;

use reqwrap::Env;
use reqwrap_core::env::env_get;
use reqwrap_core::id::ReqId;
use reqwrap_core::nloop::NativeLoop;
use reqwrap_core::{args::Verbatim, werror, winfo, wtrace, wwarn};

use crate::error::{Result, SimError};

/// Erased delivery closure wrapping the typed completion of one request.
type FireFn = Box<dyn FnOnce(i64)>;

/// A timed job handed to the worker thread.
struct Job {
    req: ReqId,
    delay: Duration,
    result: i64,
}

struct WorkerShared {
    jobs: ArrayQueue<Job>,
    completions: ArrayQueue<(ReqId, i64)>,
    shutdown: AtomicBool,
}

struct Worker {
    shared: Arc<WorkerShared>,
    handle: Option<thread::JoinHandle<()>>,
}

pub struct SimLoop {
    /// In-flight requests; loop thread only.
    pending: RefCell<HashMap<ReqId, FireFn>>,
    /// Completions queued directly on the loop thread.
    local: RefCell<VecDeque<(ReqId, i64)>>,
    /// Lazily started worker thread for timed jobs.
    worker: RefCell<Option<Worker>>,
    queue_cap: usize,
}

impl SimLoop {
    /// Queue capacity comes from `RW_SIM_QUEUE_CAP` (default 1024).
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            pending: RefCell::new(HashMap::new()),
            local: RefCell::new(VecDeque::new()),
            worker: RefCell::new(None),
            queue_cap: env_get("RW_SIM_QUEUE_CAP", 1024usize),
        })
    }

    /// Store the delivery closure for an accepted request. Returns false
    /// if the id already has one in flight.
    pub(crate) fn register(&self, req: ReqId, fire: FireFn) -> bool {
        match self.pending.borrow_mut().entry(req) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(fire);
                true
            }
        }
    }

    pub(crate) fn unregister(&self, req: ReqId) {
        self.pending.borrow_mut().remove(&req);
    }

    /// Queue a completion from the loop thread itself.
    pub(crate) fn push_local(&self, req: ReqId, result: i64) {
        self.local.borrow_mut().push_back((req, result));
    }

    /// Hand a timed job to the worker thread. Returns 0 or a negative
    /// errno, like any other native submission.
    pub(crate) fn submit_timed(&self, req: ReqId, delay: Duration, result: i64) -> i32 {
        if let Err(e) = self.ensure_worker() {
            werror!("sim: {}", e);
            return -libc::EAGAIN;
        }
        let worker = self.worker.borrow();
        let shared = &worker.as_ref().expect("worker just started").shared;
        if shared.jobs.push(Job { req, delay, result }).is_err() {
            wwarn!("sim: job queue full, rejecting {}", req);
            return -libc::EAGAIN;
        }
        0
    }

    fn ensure_worker(&self) -> Result<()> {
        if self.worker.borrow().is_some() {
            return Ok(());
        }
        let shared = Arc::new(WorkerShared {
            jobs: ArrayQueue::new(self.queue_cap),
            completions: ArrayQueue::new(self.queue_cap),
            shutdown: AtomicBool::new(false),
        });
        let shared_clone = shared.clone();
        let handle = thread::Builder::new()
            .name("reqwrap-sim-worker".into())
            .spawn(move || worker_loop(shared_clone))
            .map_err(|_| SimError::SpawnFailed)?;
        *self.worker.borrow_mut() = Some(Worker {
            shared,
            handle: Some(handle),
        });
        winfo!("sim: worker thread started, queue cap {}", self.queue_cap);
        Ok(())
    }

    /// Drain ready completions and fire their trampolines. Returns how
    /// many fired. The first entry per request wins; later duplicates
    /// (a cancel entry racing a worker result, or the other way around)
    /// are dropped.
    pub fn run_once(&self) -> usize {
        let mut entries: Vec<(ReqId, i64)> = Vec::new();
        if let Some(worker) = self.worker.borrow().as_ref() {
            while let Some(entry) = worker.shared.completions.pop() {
                entries.push(entry);
            }
        }
        entries.extend(self.local.borrow_mut().drain(..));

        let mut fired = 0;
        for (req, result) in entries {
            let fire = self.pending.borrow_mut().remove(&req);
            match fire {
                Some(fire) => {
                    fire(result);
                    fired += 1;
                }
                None => wtrace!("sim: dropping duplicate completion for {}", req),
            }
        }
        fired
    }

    /// Keep the loop turning while the environment has operations
    /// waiting, the liveness rule a real loop follows.
    pub fn run_while_waiting(&self, env: &Env) {
        while env.waiting_requests() > 0 {
            if self.run_once() == 0 {
                thread::sleep(Duration::from_micros(200));
            }
        }
    }

    /// Requests accepted but not yet completed, as the library sees it.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl NativeLoop for SimLoop {
    fn cancel(&self, req: ReqId) -> i32 {
        if self.pending.borrow().contains_key(&req) {
            // The worker may still deliver a normal result first; whichever
            // entry drains first wins.
            self.push_local(req, -(libc::ECANCELED as i64));
            wtrace!("sim: cancel queued for {}", req);
            0
        } else {
            -libc::ENOENT
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for SimLoop {
    fn drop(&mut self) {
        if let Some(mut worker) = self.worker.get_mut().take() {
            worker.shared.shutdown.store(true, Ordering::Release);
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
            winfo!("sim: worker thread stopped");
        }
    }
}

fn worker_loop(shared: Arc<WorkerShared>) {
    loop {
        if shared.shutdown.load(Ordering::Relaxed) {
            break;
        }
        match shared.jobs.pop() {
            Some(job) => {
                thread::sleep(job.delay);
                // Completion queue is sized like the job queue, so it
                // cannot overfill; a failed push only loses a completion
                // for a loop that is already gone.
                let _ = shared.completions.push((job.req, job.result));
            }
            None => thread::sleep(Duration::from_micros(50)),
        }
    }
}

/// Stream-handle analogue: the object through which operation shapes
/// without a loop parameter reach their loop. Passed verbatim through
/// dispatch.
pub struct SimHandle {
    lp: Rc<SimLoop>,
}

impl SimHandle {
    pub fn new(lp: &Rc<SimLoop>) -> Self {
        Self { lp: lp.clone() }
    }

    pub(crate) fn lp(&self) -> &SimLoop {
        &self.lp
    }
}

impl Verbatim for SimHandle {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rejects_duplicate() {
        let lp = SimLoop::new();
        assert!(lp.register(ReqId::new(1), Box::new(|_| {})));
        assert!(!lp.register(ReqId::new(1), Box::new(|_| {})));
        assert_eq!(lp.pending_count(), 1);
    }

    #[test]
    fn test_cancel_unknown_request() {
        let lp = SimLoop::new();
        assert_eq!(lp.cancel(ReqId::new(9)), -libc::ENOENT);
    }

    #[test]
    fn test_local_completion_first_wins() {
        let lp = SimLoop::new();
        let id = ReqId::new(0);
        lp.register(id, Box::new(|_| {}));
        lp.push_local(id, 1);
        lp.push_local(id, 2); // duplicate, dropped
        assert_eq!(lp.run_once(), 1);
        assert_eq!(lp.pending_count(), 0);
        assert_eq!(lp.run_once(), 0);
    }
}

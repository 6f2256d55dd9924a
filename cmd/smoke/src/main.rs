//! Reqwrap End-to-End Smoke Test
//!
//! Tests the full stack against the simulated native library:
//!   Part A — Environment: bootstrap gate, registry, waiting counter
//!   Part B — Dispatch: all three native calling shapes, rejection paths
//!   Part C — Completion: trampoline delivery, rooting, payloads
//!   Part D — Cancel: no-op, in-flight, and racing cases
//!
//! Run: ./target/release/reqwrap-smoke
//! Set RW_LOG_LEVEL=trace to watch the lifecycle transitions.

use std::cell::Cell;
use std::rc::Rc;

use reqwrap::{Env, NativeFnLoop, NativeFnRet, NativeFnVoid, Record, ReqWrap};
use reqwrap_core::ReqId;
use reqwrap_sim::{
    notify_start, post_start, sleep_start, NotifyReq, PostReq, SimHandle, SimLoop, SleepReq,
    MAX_SLEEP_MS,
};

// ── Test harness ──

struct TestRunner {
    total: usize,
    passed: usize,
    failed: usize,
}

const LINE: &str = "────────────────────────────────────────────────────────────";

impl TestRunner {
    fn new() -> Self {
        Self { total: 0, passed: 0, failed: 0 }
    }

    fn section(&self, name: &str) {
        println!("\n{}", LINE);
        println!("  {}", name);
        println!("{}", LINE);
    }

    fn pass(&mut self, name: &str) {
        self.total += 1;
        self.passed += 1;
        println!("  [{:2}] {:<52} PASS", self.total, name);
    }

    fn fail(&mut self, name: &str, reason: &str) {
        self.total += 1;
        self.failed += 1;
        println!("  [{:2}] {:<52} FAIL: {}", self.total, name, reason);
    }

    fn check(&mut self, name: &str, ok: bool, reason: &str) {
        if ok { self.pass(name); } else { self.fail(name, reason); }
    }

    fn summary(&self) {
        println!("\n{}", LINE);
        println!(
            "  Total: {}  Passed: {}  Failed: {}",
            self.total, self.passed, self.failed
        );
        println!("{}", LINE);
    }
}

// ════════════════════════════════════════════════════════════
// Part A: Environment
// ════════════════════════════════════════════════════════════

fn test_env(t: &mut TestRunner, lp: &Rc<SimLoop>, env: &Rc<Env>) {
    t.section("Part A: Environment");

    t.check("bootstrap flag set", env.has_bootstrapped(), "finish_bootstrap had no effect");
    t.check(
        "waiting counter starts at zero",
        env.waiting_requests() == 0,
        &format!("waiting={}", env.waiting_requests()),
    );

    // A3: construction registers, ids are construction-ordered
    let a = ReqWrap::new(env, PostReq::new());
    let b = ReqWrap::new(env, SleepReq::new());
    t.check(
        "registry ids in construction order",
        a.id() == ReqId::new(0) && b.id() == ReqId::new(1) && env.request_count() == 2,
        &format!("ids {} {} count {}", a.id(), b.id(), env.request_count()),
    );

    let mut live = 0;
    env.for_each_request(|_| live += 1);
    t.check("enumeration sees both wrappers", live == 2, &format!("live={}", live));

    // A5: idle wrappers have no back-reference and no rooting
    t.check(
        "idle wrapper dissociated",
        a.record().req_data() == ReqId::NONE && !a.in_flight(),
        "fresh wrapper already associated",
    );

    t.check(
        "native cancel for idle wrapper is a no-op",
        a.cancel() == 0 && lp.pending_count() == 0,
        "cancel touched the loop",
    );
}

// ════════════════════════════════════════════════════════════
// Part B: Dispatch shapes
// ════════════════════════════════════════════════════════════

fn test_dispatch(t: &mut TestRunner, lp: &Rc<SimLoop>, env: &Rc<Env>) {
    t.section("Part B: Dispatch — Three Native Shapes");

    let handle = SimHandle::new(lp);

    // B1: loop-taking shape
    let sleeper = ReqWrap::new(env, SleepReq::new());
    let status = sleeper.dispatch(
        sleep_start as NativeFnLoop<SleepReq, (u64,)>,
        (1,),
        |_rec, _payload| {},
    );
    t.check("shape (a) sleep accepted", status == 0, &format!("status={}", status));
    t.check(
        "accepted dispatch roots and counts",
        sleeper.in_flight() && env.waiting_requests() == 1,
        &format!("in_flight={} waiting={}", sleeper.in_flight(), env.waiting_requests()),
    );
    lp.run_while_waiting(env);

    // B2: loop-less shape
    let poster = ReqWrap::new(env, PostReq::new());
    let status = poster.dispatch(
        post_start as NativeFnRet<PostReq, (&SimHandle, i64)>,
        (&handle, 5),
        |_rec, _payload| {},
    );
    t.check("shape (b) post accepted", status == 0, &format!("status={}", status));
    lp.run_while_waiting(env);

    // B3: void shape, normalized to accepted
    let notifier = ReqWrap::new(env, NotifyReq::new());
    let status = notifier.dispatch(
        notify_start as NativeFnVoid<NotifyReq, (&SimHandle,)>,
        (&handle,),
        |_rec, ()| {},
    );
    t.check("shape (c) notify reports accepted", status >= 0, &format!("status={}", status));
    lp.run_while_waiting(env);

    // B4: synchronous rejection leaves everything untouched
    let rejected = ReqWrap::new(env, SleepReq::new());
    let status = rejected.dispatch(
        sleep_start as NativeFnLoop<SleepReq, (u64,)>,
        (MAX_SLEEP_MS + 1,),
        |_rec, _payload| {},
    );
    t.check(
        "out-of-range sleep rejected with -EINVAL",
        status == -libc::EINVAL,
        &format!("status={}", status),
    );
    t.check(
        "rejection leaves counter and rooting untouched",
        env.waiting_requests() == 0 && !rejected.in_flight() && lp.pending_count() == 0,
        &format!("waiting={} pending={}", env.waiting_requests(), lp.pending_count()),
    );

    // B5: after reset the wrapper dispatches like new
    rejected.reset();
    let status = rejected.dispatch(
        sleep_start as NativeFnLoop<SleepReq, (u64,)>,
        (1,),
        |_rec, _payload| {},
    );
    t.check("reset wrapper redispatches", status == 0, &format!("status={}", status));
    lp.run_while_waiting(env);
}

// ════════════════════════════════════════════════════════════
// Part C: Completion
// ════════════════════════════════════════════════════════════

fn test_completion(t: &mut TestRunner, lp: &Rc<SimLoop>, env: &Rc<Env>) {
    t.section("Part C: Completion Delivery");

    let handle = SimHandle::new(lp);

    // C1: payload passes through verbatim
    let wrap = ReqWrap::new(env, PostReq::new());
    let got = Rc::new(Cell::new(None::<i64>));
    let got2 = got.clone();
    wrap.dispatch(
        post_start as NativeFnRet<PostReq, (&SimHandle, i64)>,
        (&handle, 1234),
        move |_rec, payload| got2.set(Some(payload)),
    );
    lp.run_while_waiting(env);
    t.check(
        "callback got the exact native payload",
        got.get() == Some(1234),
        &format!("{:?}", got.get()),
    );
    t.check(
        "completion unroots and decrements",
        !wrap.in_flight() && env.waiting_requests() == 0,
        &format!("in_flight={} waiting={}", wrap.in_flight(), env.waiting_requests()),
    );

    // C2: association survives completion
    let found = ReqWrap::<PostReq>::from_id(env, wrap.id());
    t.check(
        "id lookup still resolves after completion",
        Rc::ptr_eq(&wrap, &found) && wrap.record().req_data() == wrap.id(),
        "association lost",
    );

    // C3: rooting keeps an unreferenced wrapper alive until it completes
    let got = Rc::new(Cell::new(None::<i64>));
    let got2 = got.clone();
    let before = {
        let mut n = 0;
        env.for_each_request(|_| n += 1);
        n
    };
    {
        let orphan = ReqWrap::new(env, PostReq::new());
        orphan.dispatch(
            post_start as NativeFnRet<PostReq, (&SimHandle, i64)>,
            (&handle, 77),
            move |_rec, payload| got2.set(Some(payload)),
        );
    }
    lp.run_while_waiting(env);
    let after = {
        let mut n = 0;
        env.for_each_request(|_| n += 1);
        n
    };
    t.check(
        "dropped handle still completed, then reclaimed",
        got.get() == Some(77) && after == before,
        &format!("payload={:?} live {} -> {}", got.get(), before, after),
    );

    // C4: counter conservation over a batch
    let mut wraps = Vec::new();
    for i in 0..8 {
        let w = ReqWrap::new(env, PostReq::new());
        w.dispatch(
            post_start as NativeFnRet<PostReq, (&SimHandle, i64)>,
            (&handle, i),
            |_rec, _payload| {},
        );
        wraps.push(w);
    }
    let peak = env.waiting_requests();
    lp.run_while_waiting(env);
    t.check(
        "counter conserved over a batch of 8",
        peak == 8 && env.waiting_requests() == 0,
        &format!("peak={} final={}", peak, env.waiting_requests()),
    );
}

// ════════════════════════════════════════════════════════════
// Part D: Cancel
// ════════════════════════════════════════════════════════════

fn test_cancel(t: &mut TestRunner, lp: &Rc<SimLoop>, env: &Rc<Env>) {
    t.section("Part D: Cooperative Cancel");

    let handle = SimHandle::new(lp);

    // D1: cancel before any dispatch does nothing at all
    let idle = ReqWrap::new(env, SleepReq::new());
    t.check(
        "cancel without dispatch is a silent no-op",
        idle.cancel() == 0 && lp.pending_count() == 0,
        "idle cancel reached the loop",
    );

    // D2: cancel an in-flight long sleep; the cancel entry wins
    let wrap = ReqWrap::new(env, SleepReq::new());
    let got = Rc::new(Cell::new(None::<i64>));
    let got2 = got.clone();
    wrap.dispatch(
        sleep_start as NativeFnLoop<SleepReq, (u64,)>,
        (250,),
        move |_rec, payload| got2.set(Some(payload)),
    );
    let cancel_status = wrap.cancel();
    lp.run_while_waiting(env);
    t.check(
        "in-flight cancel delivers -ECANCELED",
        cancel_status == 0 && got.get() == Some(-(libc::ECANCELED as i64)),
        &format!("cancel={} payload={:?}", cancel_status, got.get()),
    );
    t.check(
        "exactly one completion per dispatch",
        env.waiting_requests() == 0 && !wrap.in_flight(),
        &format!("waiting={}", env.waiting_requests()),
    );

    // D3: cancel racing an already-queued result loses; one delivery only
    let wrap = ReqWrap::new(env, PostReq::new());
    let got = Rc::new(Cell::new(None::<i64>));
    let got2 = got.clone();
    wrap.dispatch(
        post_start as NativeFnRet<PostReq, (&SimHandle, i64)>,
        (&handle, 42),
        move |_rec, payload| got2.set(Some(payload)),
    );
    wrap.cancel();
    lp.run_while_waiting(env);
    t.check(
        "late cancel loses to queued result",
        got.get() == Some(42) && lp.run_once() == 0,
        &format!("payload={:?}", got.get()),
    );
}

// ════════════════════════════════════════════════════════════

fn main() {
    println!("=== Reqwrap End-to-End Smoke Test ===");
    reqwrap_core::wlog::init();

    let mut t = TestRunner::new();

    // Fresh environment per part so registry counts stay local.
    let parts: [(&str, fn(&mut TestRunner, &Rc<SimLoop>, &Rc<Env>)); 4] = [
        ("env", test_env),
        ("dispatch", test_dispatch),
        ("completion", test_completion),
        ("cancel", test_cancel),
    ];
    for (_, part) in parts {
        let lp = SimLoop::new();
        let env = Env::new(lp.clone());
        env.finish_bootstrap();
        part(&mut t, &lp, &env);
        env.dump_requests();
    }

    t.summary();
    std::process::exit(if t.failed > 0 { 1 } else { 0 });
}

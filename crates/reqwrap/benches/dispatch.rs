//! Dispatch/complete cycle throughput.

use criterion::{criterion_group, criterion_main, Criterion};
use reqwrap::{Env, NativeFnRet, ReqWrap};
use reqwrap_sim::{post_start, PostReq, SimHandle, SimLoop};

fn bench_dispatch_cycle(c: &mut Criterion) {
    let lp = SimLoop::new();
    let env = Env::new(lp.clone());
    env.finish_bootstrap();
    let handle = SimHandle::new(&lp);
    let wrap = ReqWrap::new(&env, PostReq::new());

    c.bench_function("dispatch_complete_cycle", |b| {
        b.iter(|| {
            let status = wrap.dispatch(
                post_start as NativeFnRet<PostReq, (&SimHandle, i64)>,
                (&handle, 1),
                |_rec, _payload| {},
            );
            assert_eq!(status, 0);
            lp.run_while_waiting(&env);
            wrap.reset();
        })
    });
}

fn bench_construct(c: &mut Criterion) {
    c.bench_function("construct_register", |b| {
        b.iter_with_large_drop(|| {
            let lp = SimLoop::new();
            let env = Env::new(lp);
            env.finish_bootstrap();
            let mut wraps = Vec::with_capacity(64);
            for _ in 0..64 {
                wraps.push(ReqWrap::new(&env, PostReq::new()));
            }
            (env, wraps)
        })
    });
}

criterion_group!(benches, bench_dispatch_cycle, bench_construct);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{seq::SliceRandom, thread_rng};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use supplier_core::RateLimiter;

// Measures admission throughput under contention: several threads hammering
// a shared limiter across a handful of supplier keys.
pub fn rate_limiter_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("supplier_rate_limiter");

    for threads in [1, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            threads,
            |b, &threads| {
                b.iter(|| {
                    let limiter = Arc::new(RateLimiter::new());
                    let keys = ["solvex", "opengreece", "phobs", "feratel"];
                    for key in keys {
                        limiter.register(key, 10_000, Duration::from_secs(60));
                    }

                    let mut handles = vec![];
                    for _ in 0..threads {
                        let limiter = Arc::clone(&limiter);
                        let handle = thread::spawn(move || {
                            let mut rng = thread_rng();
                            let mut allowed = 0u32;
                            for _ in 0..1_000 {
                                let key = keys.choose(&mut rng).unwrap();
                                if limiter.admit(key).is_allowed() {
                                    allowed += 1;
                                }
                            }
                            allowed
                        });
                        handles.push(handle);
                    }

                    let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
                    black_box(total)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, rate_limiter_benchmark);
criterion_main!(benches);

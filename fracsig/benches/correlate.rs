use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dasp_signal::{rate, Signal};
use fracsig::kernel::KernelLifecycle;
use fracsig::signal::correlate::{CrossCorrelateConfig, CrossCorrelateKernel};
use fracsig::signal::traits::CrossCorrelate1D;

///
/// Full cross-correlation of two drifting tones, including the
/// demean/detrend/demean preprocessing.
///
fn cross_correlate_full(c: &mut Criterion) {
    let kernel = CrossCorrelateKernel::try_new(CrossCorrelateConfig::default())
        .expect("valid correlation config");
    let mut group = c.benchmark_group("cross_correlate_full");
    for len in [1024usize, 8192] {
        let mut a = rate(100_000.0).const_hz(3_000.0).sine();
        let mut b = rate(100_000.0).const_hz(3_100.0).sine();
        let a: Vec<f64> = (0..len).map(|i| a.next() + 1e-4 * i as f64).collect();
        let b: Vec<f64> = (0..len).map(|_| b.next() + 0.5).collect();
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |bench, _| {
            bench.iter(|| {
                black_box(
                    kernel
                        .run_alloc(a.as_slice(), b.as_slice())
                        .expect("benchmark inputs are non-empty"),
                );
            });
        });
    }
    group.finish();
}

criterion_group!(benches, cross_correlate_full);
criterion_main!(benches);

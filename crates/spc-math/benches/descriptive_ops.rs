//! Criterion benchmarks for `spc-math`.
//!
//! Focus on the kernels that run once per limit recomputation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spc_math::{median, moving_ranges, ols_fit, percentile_nearest_rank};

fn bench_descriptive_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("descriptive");

    for n in [32usize, 256, 2048] {
        let values: Vec<f64> = (0..n).map(|i| ((i * 37) % 101) as f64 * 0.25).collect();

        group.bench_with_input(BenchmarkId::new("median", n), &values, |b, v| {
            b.iter(|| black_box(median(black_box(v))));
        });

        group.bench_with_input(BenchmarkId::new("percentile_p25", n), &values, |b, v| {
            b.iter(|| black_box(percentile_nearest_rank(black_box(v), 25.0)));
        });

        group.bench_with_input(BenchmarkId::new("moving_ranges", n), &values, |b, v| {
            b.iter(|| black_box(moving_ranges(black_box(v))));
        });

        group.bench_with_input(BenchmarkId::new("ols_fit", n), &values, |b, v| {
            b.iter(|| black_box(ols_fit(black_box(v))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_descriptive_kernels);
criterion_main!(benches);

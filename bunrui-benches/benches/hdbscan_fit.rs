//! End-to-end HDBSCAN fit benchmarks.
//!
//! Measures a full `refit` for each spanning tree algorithm, covering core
//! distances, the spanning tree, and hierarchy extraction.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use bunrui_benches::{
    error::BenchSetupError,
    params::FitBenchParams,
    source::{BlobConfig, generate_blobs},
};
use bunrui_core::{Algorithm, ExecutionContext, Hdbscan};

/// Seed used for all synthetic data generation in this benchmark.
const SEED: u64 = 42;

/// Dataset sizes to benchmark.
const POINT_COUNTS: &[usize] = &[500, 2_000];

/// Minimum cluster size for every fit.
const MIN_CLUSTER_SIZE: usize = 15;

/// Algorithms compared in this benchmark.
const ALGORITHMS: &[Algorithm] = &[
    Algorithm::Generic,
    Algorithm::PrimKdTree,
    Algorithm::BoruvkaKdTree,
    Algorithm::BoruvkaBallTree,
];

fn hdbscan_fit_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("hdbscan_fit");
    group.sample_size(10);

    for &point_count in POINT_COUNTS {
        let data = generate_blobs(&BlobConfig::planar(point_count, SEED))?;
        let params = FitBenchParams {
            point_count,
            min_cluster_size: MIN_CLUSTER_SIZE,
        };

        for &algorithm in ALGORITHMS {
            let model = Hdbscan::builder()
                .with_min_cluster_size(MIN_CLUSTER_SIZE)
                .with_algorithm(algorithm)
                .with_execution_context(ExecutionContext::sequential())
                .build()?;
            group.bench_with_input(
                BenchmarkId::new(algorithm.as_str(), &params),
                &data,
                |b, samples| b.iter(|| model.refit(samples.clone())),
            );
        }
    }

    group.finish();
    Ok(())
}

fn hdbscan_fit(c: &mut Criterion) {
    if let Err(err) = hdbscan_fit_impl(c) {
        panic!("hdbscan_fit benchmark setup failed: {err}");
    }
}

criterion_group!(benches, hdbscan_fit);
criterion_main!(benches);

//! Mutual-reachability spanning tree benchmarks.
//!
//! Measures dual-tree Boruvka and tree-accelerated Prim against a prebuilt
//! KD tree with precomputed core distances, and the dense Prim builder on
//! the full mutual-reachability matrix.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use bunrui_benches::{
    error::BenchSetupError,
    params::PipelineBenchParams,
    source::{BlobConfig, generate_blobs},
};
use bunrui_core::{
    DistanceMatrix, ExecutionContext, KdTree, KnnOptions, Metric, boruvka, generic_prim,
    tree_prim,
};

/// Seed used for all synthetic data generation in this benchmark.
const SEED: u64 = 42;

/// Dataset sizes for the tree-backed builders.
const POINT_COUNTS: &[usize] = &[500, 2_000];

/// Dataset sizes for the quadratic dense builder.
const DENSE_POINT_COUNTS: &[usize] = &[250, 500];

/// Neighbour rank that defines a core distance.
const MIN_SAMPLES: usize = 5;

/// Leaf size shared by every tree.
const LEAF_SIZE: usize = 40;

fn core_distances(tree: &KdTree) -> Result<Vec<f64>, BenchSetupError> {
    let neighbours = tree.query(tree.data(), MIN_SAMPLES, KnnOptions::default())?;
    neighbours
        .distances()
        .iter()
        .enumerate()
        .map(|(row, distances)| {
            distances
                .last()
                .copied()
                .ok_or(BenchSetupError::MissingCoreDistance { row })
        })
        .collect()
}

fn tree_builders_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("mst_tree");
    group.sample_size(20);
    let context = ExecutionContext::sequential();

    for &point_count in POINT_COUNTS {
        let data = generate_blobs(&BlobConfig::planar(point_count, SEED))?;
        let tree = KdTree::build(data, LEAF_SIZE, Metric::Euclidean)?
            .with_execution_context(context);
        let core = core_distances(&tree)?;
        let params = PipelineBenchParams { point_count };

        group.bench_with_input(BenchmarkId::new("boruvka", &params), &core, |b, distances| {
            b.iter(|| boruvka(&tree, distances, 1.0, &context));
        });
        group.bench_with_input(BenchmarkId::new("prim", &params), &core, |b, distances| {
            b.iter(|| tree_prim(&tree, distances, 1.0, &context));
        });
    }

    group.finish();
    Ok(())
}

fn dense_builder_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("mst_dense");
    group.sample_size(10);

    for &point_count in DENSE_POINT_COUNTS {
        let data = generate_blobs(&BlobConfig::planar(point_count, SEED))?;
        let reachability =
            DistanceMatrix::from_samples(&data, &Metric::Euclidean, &ExecutionContext::sequential())
                .mutual_reachability(MIN_SAMPLES);
        let params = PipelineBenchParams { point_count };

        group.bench_with_input(
            BenchmarkId::new("generic_prim", &params),
            &reachability,
            |b, matrix| b.iter(|| generic_prim(matrix)),
        );
    }

    group.finish();
    Ok(())
}

fn tree_builders(c: &mut Criterion) {
    if let Err(err) = tree_builders_impl(c) {
        panic!("tree_builders benchmark setup failed: {err}");
    }
}

fn dense_builder(c: &mut Criterion) {
    if let Err(err) = dense_builder_impl(c) {
        panic!("dense_builder benchmark setup failed: {err}");
    }
}

criterion_group!(benches, tree_builders, dense_builder);
criterion_main!(benches);

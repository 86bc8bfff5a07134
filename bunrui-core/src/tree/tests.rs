//! Tests for tree construction and every query family.
//!
//! Most properties compare the trees against [`BruteForce`] on seeded
//! uniform data; continuous samples make distance ties vanishingly rare, so
//! neighbour indices are compared exactly and distances within a tolerance.

use proptest::prelude::*;
use rstest::rstest;
use test_strategy::Arbitrary;

use super::{
    BallTree, BinaryTree, BruteForce, KdTree, KdeOptions, Kernel, KnnOptions, NearestNeighbors,
    NeighborsAlgorithm, Neighborhood, NodeBounds, SpatialTree, TreeError,
};
use crate::{
    error::MetricError,
    matrix::SampleMatrix,
    metric::{DistanceMetric, Metric},
    parallel::ExecutionContext,
    test_utils::{suite_proptest_config, uniform_samples},
};

const DISTANCE_TOLERANCE: f64 = 1e-9;

/// Metrics accepted by both tree kinds.
#[derive(Clone, Copy, Debug, PartialEq, Arbitrary)]
enum TreeMetric {
    #[weight(3)]
    Euclidean,
    Manhattan,
    Chebyshev,
    Minkowski,
}

impl TreeMetric {
    fn metric(self) -> Metric {
        match self {
            Self::Euclidean => Metric::Euclidean,
            Self::Manhattan => Metric::Manhattan,
            Self::Chebyshev => Metric::Chebyshev,
            Self::Minkowski => Metric::Minkowski { p: 3.0 },
        }
    }
}

fn reachable_nodes<B: NodeBounds>(tree: &BinaryTree<B>) -> Vec<usize> {
    let mut reachable = Vec::new();
    let mut stack = vec![0];
    while let Some(node) = stack.pop() {
        reachable.push(node);
        if !tree.node_data()[node].is_leaf {
            stack.push(2 * node + 1);
            stack.push(2 * node + 2);
        }
    }
    reachable.sort_unstable();
    reachable
}

fn check_structure<B: NodeBounds>(tree: &BinaryTree<B>) -> Result<(), TestCaseError> {
    let mut seen = vec![false; tree.n_samples()];
    for &index in tree.index_array() {
        prop_assert!(!seen[index], "sample {index} appears twice");
        seen[index] = true;
    }
    let root = tree.node_data()[0];
    prop_assert_eq!((root.start, root.end), (0, tree.n_samples()));
    for node in reachable_nodes(tree) {
        let info = tree.node_data()[node];
        prop_assert!(info.start < info.end, "node {node} is empty");
        if info.is_leaf {
            continue;
        }
        let left = tree.node_data()[2 * node + 1];
        let right = tree.node_data()[2 * node + 2];
        prop_assert_eq!(left.start, info.start);
        prop_assert_eq!(left.end, right.start);
        prop_assert_eq!(right.end, info.end);
        prop_assert!(info.len() > tree.leaf_size(), "node {node} should be a leaf");
    }
    Ok(())
}

fn check_bounds<B: NodeBounds>(
    tree: &BinaryTree<B>,
    queries: &SampleMatrix,
) -> Result<(), TestCaseError> {
    let metric = tree.metric();
    for node in reachable_nodes(tree) {
        for query in queries.iter_rows() {
            let lower = tree.min_dist(node, query);
            let upper = tree.max_dist(node, query);
            for &index in tree.node_indices(node) {
                let distance = metric.distance(query, tree.data().row(index));
                prop_assert!(lower <= distance + DISTANCE_TOLERANCE, "node {node} lower bound");
                prop_assert!(upper + DISTANCE_TOLERANCE >= distance, "node {node} upper bound");
            }
        }
    }
    Ok(())
}

fn assert_same_neighbours(
    actual: &Neighborhood,
    expected: &Neighborhood,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(actual.len(), expected.len());
    for row in 0..expected.len() {
        let (actual_distances, actual_indices) = actual.row(row).expect("row exists");
        let (expected_distances, expected_indices) = expected.row(row).expect("row exists");
        prop_assert_eq!(actual_indices, expected_indices, "row {}", row);
        for (a, e) in actual_distances.iter().zip(expected_distances) {
            prop_assert!((a - e).abs() <= DISTANCE_TOLERANCE, "row {row}: {a} vs {e}");
        }
    }
    Ok(())
}

fn sorted_sets(neighbourhood: &Neighborhood) -> Vec<Vec<usize>> {
    neighbourhood
        .indices()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.sort_unstable();
            row
        })
        .collect()
}

fn relative_gap(actual: f64, expected: f64) -> f64 {
    if actual == expected {
        return 0.0;
    }
    (actual - expected).abs() / expected.abs().max(f64::MIN_POSITIVE)
}

fn knn_matches_brute<B: NodeBounds>(
    seed: u64,
    rows: usize,
    cols: usize,
    leaf_size: usize,
    metric: Metric,
    k_seed: usize,
) -> Result<(), TestCaseError> {
    let data = uniform_samples(seed, rows, cols);
    let queries = uniform_samples(seed ^ 0x5eed, rows.min(24), cols);
    let k = 1 + k_seed % rows;
    let tree = BinaryTree::<B>::build(data.clone(), leaf_size, metric).expect("valid tree");
    let brute = BruteForce::new(data, metric).expect("valid brute force");
    let expected = brute
        .query(&queries, k, KnnOptions::default())
        .expect("brute query");
    for dual_tree in [false, true] {
        for breadth_first in [false, true] {
            let options = KnnOptions::default()
                .with_dual_tree(dual_tree)
                .with_breadth_first(breadth_first);
            let actual = tree.query(&queries, k, options).expect("tree query");
            assert_same_neighbours(&actual, &expected)?;
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(suite_proptest_config(48))]

    #[test]
    fn kd_construction_invariants(
        seed in any::<u64>(),
        rows in 1_usize..200,
        cols in 1_usize..5,
        leaf_size in 1_usize..16,
        metric in any::<TreeMetric>(),
    ) {
        let tree = KdTree::build(uniform_samples(seed, rows, cols), leaf_size, metric.metric())
            .expect("valid tree");
        check_structure(&tree)?;
        check_bounds(&tree, &uniform_samples(seed.wrapping_add(1), 4, cols))?;
    }

    #[test]
    fn ball_construction_invariants(
        seed in any::<u64>(),
        rows in 1_usize..200,
        cols in 1_usize..5,
        leaf_size in 1_usize..16,
        metric in any::<TreeMetric>(),
    ) {
        let tree = BallTree::build(uniform_samples(seed, rows, cols), leaf_size, metric.metric())
            .expect("valid tree");
        check_structure(&tree)?;
        check_bounds(&tree, &uniform_samples(seed.wrapping_add(1), 4, cols))?;
    }

    #[test]
    fn kd_knn_matches_brute_force(
        seed in any::<u64>(),
        rows in 1_usize..150,
        cols in 1_usize..4,
        leaf_size in 1_usize..12,
        metric in any::<TreeMetric>(),
        k_seed in any::<usize>(),
    ) {
        knn_matches_brute::<super::KdBounds>(seed, rows, cols, leaf_size, metric.metric(), k_seed)?;
    }

    #[test]
    fn ball_knn_matches_brute_force(
        seed in any::<u64>(),
        rows in 1_usize..150,
        cols in 1_usize..4,
        leaf_size in 1_usize..12,
        metric in any::<TreeMetric>(),
        k_seed in any::<usize>(),
    ) {
        knn_matches_brute::<super::BallBounds>(seed, rows, cols, leaf_size, metric.metric(), k_seed)?;
    }

    #[test]
    fn radius_queries_match_brute_force(
        seed in any::<u64>(),
        rows in 1_usize..150,
        cols in 1_usize..4,
        leaf_size in 1_usize..12,
        metric in any::<TreeMetric>(),
        radius in 0.0_f64..12.0,
    ) {
        let data = uniform_samples(seed, rows, cols);
        let queries = uniform_samples(seed ^ 0xa11ce, 16, cols);
        let metric = metric.metric();
        let brute = BruteForce::new(data.clone(), metric).expect("valid brute force");
        let expected = brute.query_radius(&queries, radius, true).expect("brute radius");
        let expected_counts = brute.query_radius_count(&queries, radius).expect("brute count");

        let kd = KdTree::build(data.clone(), leaf_size, metric).expect("valid tree");
        let ball = BallTree::build(data, leaf_size, metric).expect("valid tree");
        let trees: [&dyn SpatialTree; 2] = [&kd, &ball];
        for tree in trees {
            let sorted = tree.query_radius(&queries, radius, true).expect("tree radius");
            assert_same_neighbours(&sorted, &expected)?;
            let unsorted = tree.query_radius(&queries, radius, false).expect("tree radius");
            prop_assert_eq!(sorted_sets(&unsorted), sorted_sets(&expected));
            let counts = tree.query_radius_count(&queries, radius).expect("tree count");
            prop_assert_eq!(&counts, &expected_counts);
        }
    }

    #[test]
    fn radius_covers_the_k_nearest(
        seed in any::<u64>(),
        rows in 2_usize..120,
        leaf_size in 1_usize..10,
        k_seed in any::<usize>(),
    ) {
        let data = uniform_samples(seed, rows, 2);
        let k = 1 + k_seed % rows;
        let tree = KdTree::build(data.clone(), leaf_size, Metric::Euclidean).expect("valid tree");
        let knn = tree.query(&data, k, KnnOptions::default()).expect("knn");
        for row in 0..rows {
            let (distances, indices) = knn.row(row).expect("row exists");
            let radius = distances[k - 1] + DISTANCE_TOLERANCE;
            let single = SampleMatrix::from_rows(&[data.row(row)]).expect("one row");
            let within = tree.query_radius(&single, radius, false).expect("radius");
            for index in indices {
                prop_assert!(within.indices()[0].contains(index), "row {row} misses {index}");
            }
        }
    }

    #[test]
    fn two_point_correlation_matches_brute_force(
        seed in any::<u64>(),
        rows in 1_usize..120,
        leaf_size in 1_usize..10,
        radii in proptest::collection::vec(0.0_f64..15.0, 1..6),
    ) {
        let data = uniform_samples(seed, rows, 2);
        let brute = BruteForce::new(data.clone(), Metric::Euclidean).expect("valid brute force");
        let expected = brute.two_point_correlation(&data, &radii).expect("brute correlation");
        let kd = KdTree::build(data.clone(), leaf_size, Metric::Euclidean).expect("valid tree");
        let ball = BallTree::build(data.clone(), leaf_size, Metric::Euclidean).expect("valid tree");
        prop_assert_eq!(&kd.two_point_correlation(&data, &radii).expect("kd"), &expected);
        prop_assert_eq!(&ball.two_point_correlation(&data, &radii).expect("ball"), &expected);
    }
}

#[rstest]
#[case::gaussian(Kernel::Gaussian)]
#[case::tophat(Kernel::Tophat)]
#[case::epanechnikov(Kernel::Epanechnikov)]
#[case::exponential(Kernel::Exponential)]
#[case::linear(Kernel::Linear)]
#[case::cosine(Kernel::Cosine)]
fn exact_kernel_density_matches_brute_force(
    #[case] kernel: Kernel,
    #[values(false, true)] breadth_first: bool,
) {
    let data = uniform_samples(7, 300, 2);
    let queries = uniform_samples(8, 20, 2);
    let bandwidth = 2.5;
    let options = KdeOptions::default()
        .with_rtol(0.0)
        .with_breadth_first(breadth_first);
    let brute = BruteForce::new(data.clone(), Metric::Euclidean).expect("valid brute force");
    let expected = brute
        .kernel_density(&queries, bandwidth, kernel, options)
        .expect("brute density");
    let kd = KdTree::build(data.clone(), 10, Metric::Euclidean).expect("valid tree");
    let ball = BallTree::build(data, 10, Metric::Euclidean).expect("valid tree");
    for actual in [
        kd.kernel_density(&queries, bandwidth, kernel, options),
        ball.kernel_density(&queries, bandwidth, kernel, options),
    ] {
        let actual = actual.expect("tree density");
        for (a, e) in actual.iter().zip(&expected) {
            assert!(relative_gap(*a, *e) <= 1e-6, "{kernel:?}: {a} vs {e}");
        }
    }
}

#[test]
fn approximate_kernel_density_honours_relative_tolerance() {
    let data = uniform_samples(11, 500, 3);
    let queries = uniform_samples(12, 10, 3);
    let rtol = 1e-3;
    let tree = KdTree::build(data.clone(), 20, Metric::Euclidean).expect("valid tree");
    let brute = BruteForce::new(data, Metric::Euclidean).expect("valid brute force");
    let options = KdeOptions::default().with_rtol(rtol);
    let expected = brute
        .kernel_density(&queries, 1.5, Kernel::Gaussian, options)
        .expect("brute density");
    let actual = tree
        .kernel_density(&queries, 1.5, Kernel::Gaussian, options)
        .expect("tree density");
    for (a, e) in actual.iter().zip(&expected) {
        assert!(relative_gap(*a, *e) <= rtol, "{a} vs {e}");
    }
}

#[rstest]
#[case::euclidean(Metric::Euclidean)]
#[case::manhattan(Metric::Manhattan)]
#[case::minkowski(Metric::Minkowski { p: 3.0 })]
fn node_pair_distance_bounds_never_overshoot(#[case] metric: Metric) {
    let left = KdTree::build(uniform_samples(31, 60, 2), 4, metric).expect("valid tree");
    let right = KdTree::build(uniform_samples(32, 45, 2), 4, metric).expect("valid tree");
    for node1 in 0..left.n_nodes() {
        for node2 in 0..right.n_nodes() {
            let bound = left.min_dist_dual(node1, &right, node2);
            let reduced = left.min_rdist_dual(node1, &right, node2);
            assert!((metric.partial_to_distance(reduced) - bound).abs() <= DISTANCE_TOLERANCE);
            let closest = left
                .node_indices(node1)
                .iter()
                .flat_map(|&a| {
                    right
                        .node_indices(node2)
                        .iter()
                        .map(move |&b| (a, b))
                })
                .map(|(a, b)| metric.distance(left.data().row(a), right.data().row(b)))
                .fold(f64::INFINITY, f64::min);
            assert!(bound <= closest + DISTANCE_TOLERANCE, "nodes {node1}, {node2}");
        }
    }
}

#[rstest]
#[case::euclidean(Metric::Euclidean, 3)]
#[case::haversine(Metric::Haversine, 2)]
fn ball_nodes_halve_at_the_median_and_cover_their_points(
    #[case] metric: Metric,
    #[case] cols: usize,
) {
    let tree = BallTree::build(uniform_samples(21, 157, cols), 6, metric).expect("valid tree");
    let mut pending = vec![0_usize];
    while let Some(node) = pending.pop() {
        let info = tree.node_data()[node];
        let centroid = tree.bounds().centroid(node);
        for &index in tree.node_indices(node) {
            let distance = metric.distance(centroid, tree.data().row(index));
            assert!(distance <= info.radius + DISTANCE_TOLERANCE, "node {node}");
        }
        if info.is_leaf {
            continue;
        }
        let (left, right) = (2 * node + 1, 2 * node + 2);
        let (left_info, right_info) = (tree.node_data()[left], tree.node_data()[right]);
        assert_eq!((left_info.start, left_info.end), (info.start, right_info.start));
        assert_eq!(right_info.end, info.end);
        assert!(right_info.len().abs_diff(left_info.len()) <= 1, "node {node}");
        pending.extend([left, right]);
    }
}

#[test]
fn log_density_is_the_log_of_density() {
    let data = uniform_samples(3, 80, 2);
    let tree = BallTree::build(data.clone(), 5, Metric::Euclidean).expect("valid tree");
    let exact = KdeOptions::default().with_rtol(0.0);
    let density = tree
        .kernel_density(&data, 1.0, Kernel::Exponential, exact)
        .expect("density");
    let log_density = tree
        .kernel_density(&data, 1.0, Kernel::Exponential, exact.with_log(true))
        .expect("log density");
    for (d, l) in density.iter().zip(&log_density) {
        assert!((d.ln() - l).abs() <= 1e-9);
    }
}

#[rstest]
#[case::zero_leaf(0, Metric::Euclidean, TreeError::InvalidLeafSize { got: 0 })]
#[case::bad_minkowski(
    4,
    Metric::Minkowski { p: 0.5 },
    TreeError::Metric(MetricError::InvalidMinkowskiPower { p: 0.5 }),
)]
#[case::cosine(
    4,
    Metric::Cosine,
    TreeError::Metric(MetricError::UnsupportedForTree { metric: "cosine", tree: "kd_tree" }),
)]
#[case::haversine(
    4,
    Metric::Haversine,
    TreeError::Metric(MetricError::UnsupportedForTree { metric: "haversine", tree: "kd_tree" }),
)]
fn kd_build_rejects_invalid_configuration(
    #[case] leaf_size: usize,
    #[case] metric: Metric,
    #[case] expected: TreeError,
) {
    let error = KdTree::build(uniform_samples(1, 10, 2), leaf_size, metric)
        .expect_err("configuration must be rejected");
    assert_eq!(error, expected);
}

#[test]
fn ball_tree_accepts_haversine_but_checks_dimension() {
    let data = SampleMatrix::from_rows(&[vec![0.0, 0.0], vec![0.5, 1.0], vec![-0.3, 2.0]])
        .expect("valid data");
    let tree = BallTree::build(data.clone(), 1, Metric::Haversine).expect("valid tree");
    let brute = BruteForce::new(data.clone(), Metric::Haversine).expect("valid brute force");
    let expected = brute.query(&data, 3, KnnOptions::default()).expect("brute");
    let actual = tree.query(&data, 3, KnnOptions::default()).expect("tree");
    assert_eq!(actual.indices(), expected.indices());

    let error = BallTree::build(uniform_samples(1, 5, 3), 1, Metric::Haversine)
        .expect_err("haversine needs two features");
    assert_eq!(error.code().as_str(), "TREE_METRIC_FAILURE");
}

#[rstest]
#[case::zero(0)]
#[case::too_many(11)]
fn query_rejects_out_of_range_k(#[case] k: usize) {
    let tree = KdTree::build(uniform_samples(2, 10, 2), 3, Metric::Euclidean).expect("valid tree");
    let error = tree
        .query(&uniform_samples(3, 2, 2), k, KnnOptions::default())
        .expect_err("k is out of range");
    assert_eq!(error, TreeError::InvalidK { k, available: 10 });
}

#[test]
fn queries_reject_wrong_dimension() {
    let tree = BallTree::build(uniform_samples(2, 10, 2), 3, Metric::Euclidean).expect("valid tree");
    let points = uniform_samples(3, 2, 3);
    let expected = TreeError::DimensionMismatch {
        expected: 2,
        actual: 3,
    };
    assert_eq!(
        tree.query(&points, 1, KnnOptions::default()).expect_err("mismatch"),
        expected
    );
    assert_eq!(tree.query_radius(&points, 1.0, true).expect_err("mismatch"), expected);
    assert_eq!(tree.query_radius_count(&points, 1.0).expect_err("mismatch"), expected);
    assert_eq!(
        tree.kernel_density(&points, 1.0, Kernel::Gaussian, KdeOptions::default())
            .expect_err("mismatch"),
        expected
    );
}

#[rstest]
#[case::negative(-1.0)]
#[case::nan(f64::NAN)]
#[case::infinite(f64::INFINITY)]
fn radius_queries_reject_invalid_radius(#[case] radius: f64) {
    let data = uniform_samples(4, 10, 2);
    let tree = KdTree::build(data.clone(), 3, Metric::Euclidean).expect("valid tree");
    let error = tree.query_radius(&data, radius, false).expect_err("invalid radius");
    assert_eq!(error.code().as_str(), "TREE_INVALID_RADIUS");
    let error = tree
        .two_point_correlation(&data, &[1.0, radius])
        .expect_err("invalid radius");
    assert_eq!(error.code().as_str(), "TREE_INVALID_RADIUS");
}

#[rstest]
#[case::zero_bandwidth(0.0, KdeOptions::default(), "TREE_INVALID_BANDWIDTH")]
#[case::nan_bandwidth(f64::NAN, KdeOptions::default(), "TREE_INVALID_BANDWIDTH")]
#[case::negative_atol(1.0, KdeOptions::default().with_atol(-1.0), "TREE_INVALID_TOLERANCE")]
#[case::nan_rtol(1.0, KdeOptions::default().with_rtol(f64::NAN), "TREE_INVALID_TOLERANCE")]
fn kernel_density_rejects_invalid_parameters(
    #[case] bandwidth: f64,
    #[case] options: KdeOptions,
    #[case] code: &str,
) {
    let data = uniform_samples(5, 10, 2);
    let tree = KdTree::build(data.clone(), 3, Metric::Euclidean).expect("valid tree");
    let error = tree
        .kernel_density(&data, bandwidth, Kernel::Gaussian, options)
        .expect_err("invalid parameters");
    assert_eq!(error.code().as_str(), code);
}

#[test]
fn unsorted_knn_returns_the_same_neighbours() {
    let data = uniform_samples(9, 60, 3);
    let tree = KdTree::build(data.clone(), 4, Metric::Euclidean).expect("valid tree");
    let sorted = tree.query(&data, 5, KnnOptions::default()).expect("sorted");
    let raw = tree
        .query(&data, 5, KnnOptions::default().with_sorted(false))
        .expect("unsorted");
    assert_eq!(sorted_sets(&raw), sorted_sets(&sorted));
    for row in sorted.distances() {
        assert!(row.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}

#[test]
fn self_query_finds_each_point_first() {
    let data = uniform_samples(10, 90, 2);
    let tree = BallTree::build(data.clone(), 6, Metric::Manhattan).expect("valid tree");
    let neighbours = tree.query(&data, 1, KnnOptions::default()).expect("query");
    for (row, (distances, indices)) in neighbours
        .distances()
        .iter()
        .zip(neighbours.indices())
        .enumerate()
    {
        assert_eq!(indices, &vec![row]);
        assert_eq!(distances, &vec![0.0]);
    }
}

#[rstest]
#[case::sequential(ExecutionContext::sequential())]
#[case::parallel(ExecutionContext::force_parallel())]
fn execution_context_does_not_change_results(#[case] context: ExecutionContext) {
    let data = uniform_samples(13, 400, 3);
    let baseline = KdTree::build(data.clone(), 8, Metric::Euclidean).expect("valid tree");
    let tree = baseline.clone().with_execution_context(context);
    assert_eq!(tree.execution_context(), context);
    let options = KnnOptions::default();
    assert_eq!(
        tree.query(&data, 4, options).expect("query"),
        baseline.query(&data, 4, options).expect("query")
    );
    assert_eq!(
        tree.query_radius_count(&data, 2.0).expect("count"),
        baseline.query_radius_count(&data, 2.0).expect("count")
    );
}

#[test]
fn single_sample_tree_is_one_leaf() {
    let data = SampleMatrix::from_rows(&[vec![1.0, 2.0]]).expect("valid data");
    let tree = KdTree::build(data.clone(), 40, Metric::Euclidean).expect("valid tree");
    assert_eq!(tree.n_levels(), 1);
    assert_eq!(tree.n_nodes(), 1);
    assert!(tree.node_data()[0].is_leaf);
    let neighbours = tree.query(&data, 1, KnnOptions::default()).expect("query");
    assert_eq!(neighbours.indices(), &[vec![0]]);
}

#[test]
fn snapshots_restore_identical_trees() {
    let data = uniform_samples(14, 70, 3);
    let kd = KdTree::build(data.clone(), 5, Metric::Chebyshev).expect("valid tree");
    let restored = KdTree::from_snapshot(kd.snapshot()).expect("valid snapshot");
    assert_eq!(restored.index_array(), kd.index_array());
    assert_eq!(restored.node_data(), kd.node_data());
    assert_eq!(restored.snapshot(), kd.snapshot());
    let options = KnnOptions::default();
    assert_eq!(
        restored.query(&data, 3, options).expect("query"),
        kd.query(&data, 3, options).expect("query")
    );

    let ball = BallTree::build(data, 5, Metric::Euclidean).expect("valid tree");
    let restored = BallTree::from_snapshot(ball.snapshot()).expect("valid snapshot");
    assert_eq!(restored.snapshot(), ball.snapshot());
}

#[test]
fn snapshots_with_broken_structure_are_rejected() {
    let tree = KdTree::build(uniform_samples(15, 40, 2), 4, Metric::Euclidean).expect("valid tree");

    let mut duplicated = tree.snapshot();
    duplicated.index_array[1] = duplicated.index_array[0];
    let mut truncated = tree.snapshot();
    truncated.node_data.pop();
    let mut shifted = tree.snapshot();
    shifted.node_data[1].end += 1;
    let mut short_bounds = tree.snapshot();
    short_bounds.bounds.pop();

    for snapshot in [duplicated, truncated, shifted, short_bounds] {
        let error = KdTree::from_snapshot(snapshot).expect_err("snapshot must be rejected");
        assert_eq!(error.code().as_str(), "TREE_INVALID_SNAPSHOT");
    }

    let mut unsupported = tree.snapshot();
    unsupported.metric = Metric::Cosine;
    assert_eq!(
        KdTree::from_snapshot(unsupported)
            .expect_err("cosine is rejected")
            .code()
            .as_str(),
        "TREE_METRIC_FAILURE"
    );
}

#[rstest]
#[case::euclidean(NeighborsAlgorithm::Auto, Metric::Euclidean, NeighborsAlgorithm::KdTree)]
#[case::haversine(NeighborsAlgorithm::Auto, Metric::Haversine, NeighborsAlgorithm::BallTree)]
#[case::cosine(NeighborsAlgorithm::Auto, Metric::Cosine, NeighborsAlgorithm::Brute)]
#[case::explicit_ball(NeighborsAlgorithm::BallTree, Metric::Euclidean, NeighborsAlgorithm::BallTree)]
#[case::explicit_brute(NeighborsAlgorithm::Brute, Metric::Euclidean, NeighborsAlgorithm::Brute)]
fn auto_resolution_prefers_trees(
    #[case] requested: NeighborsAlgorithm,
    #[case] metric: Metric,
    #[case] expected: NeighborsAlgorithm,
) {
    assert_eq!(requested.resolve(&metric), expected);
    let index = NearestNeighbors::fit(uniform_samples(16, 20, 2), requested, metric, 4)
        .expect("valid index");
    assert_eq!(index.algorithm(), expected);
    assert_eq!(index.n_samples(), 20);
    assert_eq!(index.metric(), metric);
}

#[test]
fn nearest_neighbors_rejects_tree_without_metric_support() {
    let error = NearestNeighbors::fit(
        uniform_samples(17, 10, 2),
        NeighborsAlgorithm::KdTree,
        Metric::Haversine,
        4,
    )
    .expect_err("kd tree cannot use haversine");
    assert_eq!(error.code().as_str(), "TREE_METRIC_FAILURE");
}

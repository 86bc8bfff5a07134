//! Unit tests for the model surface.

use rstest::rstest;

use super::{Algorithm, FitStage, FitWarning, HdbscanBuilder};
use crate::{
    error::HdbscanError,
    hierarchy::ClusterSelection,
    matrix::SampleMatrix,
    metric::Metric,
    parallel::ExecutionContext,
    test_utils::blob_samples,
};

const CENTRES: [[f64; 2]; 3] = [[0.0, 0.0], [20.0, 0.0], [0.0, 20.0]];

fn scenario_two() -> SampleMatrix {
    SampleMatrix::from_rows(&[
        vec![0.0, 1.0, 0.0, 2.0],
        vec![0.0, 0.0, 1.0, 2.0],
        vec![5.0, 6.0, 7.0, 4.0],
    ])
    .expect("valid data")
}

#[rstest]
#[case::min_cluster_size(HdbscanBuilder::new().with_min_cluster_size(0), "HDBSCAN_INVALID_MIN_CLUSTER_SIZE")]
#[case::min_samples(HdbscanBuilder::new().with_min_samples(0), "HDBSCAN_INVALID_MIN_SAMPLES")]
#[case::zero_alpha(HdbscanBuilder::new().with_alpha(0.0), "HDBSCAN_INVALID_ALPHA")]
#[case::negative_alpha(HdbscanBuilder::new().with_alpha(-2.0), "HDBSCAN_INVALID_ALPHA")]
#[case::nan_alpha(HdbscanBuilder::new().with_alpha(f64::NAN), "HDBSCAN_INVALID_ALPHA")]
#[case::infinite_alpha(HdbscanBuilder::new().with_alpha(f64::INFINITY), "HDBSCAN_INVALID_ALPHA")]
#[case::leaf_size(HdbscanBuilder::new().with_leaf_size(0), "HDBSCAN_INVALID_LEAF_SIZE")]
#[case::metric(
    HdbscanBuilder::new().with_metric(Metric::Minkowski { p: 0.5 }),
    "HDBSCAN_METRIC_FAILURE"
)]
fn build_rejects_invalid_configuration(#[case] builder: HdbscanBuilder, #[case] code: &str) {
    let error = builder.build().expect_err("configuration must be rejected");
    assert_eq!(error.code().as_str(), code);
}

#[test]
fn builder_defaults() {
    let model = HdbscanBuilder::new().build().expect("defaults are valid");
    let config = model.config();
    assert_eq!(config.min_cluster_size().get(), 5);
    assert_eq!(config.min_samples().get(), 5);
    assert_eq!(config.alpha(), 1.0);
    assert_eq!(config.leaf_size().get(), 40);
    assert_eq!(config.metric(), Metric::Euclidean);
    assert_eq!(config.algorithm(), Algorithm::Auto);
    assert_eq!(config.cluster_selection(), ClusterSelection::ExcessOfMass);
    assert!(!config.allow_single_cluster());
    assert_eq!(model.stage(), FitStage::Unfit);
}

#[rstest]
#[case::cosine_is_dense(Algorithm::Auto, Metric::Cosine, 500, 3, Algorithm::Generic)]
#[case::small_is_dense(Algorithm::Auto, Metric::Euclidean, 64, 3, Algorithm::Generic)]
#[case::boruvka_kd(Algorithm::Auto, Metric::Manhattan, 65, 3, Algorithm::BoruvkaKdTree)]
#[case::boruvka_ball(Algorithm::Auto, Metric::Haversine, 65, 2, Algorithm::BoruvkaBallTree)]
#[case::wide_prim(Algorithm::Auto, Metric::Euclidean, 500, 61, Algorithm::PrimKdTree)]
#[case::explicit(Algorithm::PrimBallTree, Metric::Chebyshev, 10, 2, Algorithm::PrimBallTree)]
fn auto_resolution(
    #[case] requested: Algorithm,
    #[case] metric: Metric,
    #[case] rows: usize,
    #[case] cols: usize,
    #[case] expected: Algorithm,
) {
    let (resolved, used, warning) = requested.resolve(metric, rows, cols);
    assert_eq!(resolved, expected);
    assert_eq!(used, metric);
    assert!(warning.is_none());
}

#[rstest]
#[case::kd_haversine(Algorithm::PrimKdTree, Metric::Haversine)]
#[case::kd_cosine(Algorithm::BoruvkaKdTree, Metric::Cosine)]
#[case::ball_cosine(Algorithm::BoruvkaBallTree, Metric::Cosine)]
fn unsupported_tree_metrics_fall_back(#[case] algorithm: Algorithm, #[case] metric: Metric) {
    let (resolved, used, warning) = algorithm.resolve(metric, 200, 2);
    assert_eq!(resolved, algorithm);
    assert_eq!(used, Metric::Euclidean);
    assert_eq!(
        warning,
        Some(FitWarning::MetricFallback {
            requested: metric,
            algorithm,
        })
    );
}

#[test]
fn accessors_fail_before_fit() {
    let model = HdbscanBuilder::new().build().expect("defaults are valid");
    let error = model.labels().expect_err("model is unfitted");
    assert_eq!(error, HdbscanError::NotFitted { stage: FitStage::Unfit });
    assert_eq!(error.code().as_str(), "HDBSCAN_NOT_FITTED");
    assert!(model.snapshot().is_err());
    assert!(model.condensed_tree().is_err());
}

#[test]
fn min_cluster_size_one_on_three_points_is_all_noise() {
    let model = HdbscanBuilder::new()
        .with_min_cluster_size(1)
        .build()
        .expect("valid configuration");
    model.fit(scenario_two()).expect("fit succeeds");
    assert_eq!(model.labels().expect("fitted"), vec![-1, -1, -1]);
    assert_eq!(model.n_clusters().expect("fitted"), 0);
    assert_eq!(model.n_noise().expect("fitted"), 3);
    assert_eq!(model.stage(), FitStage::LabelsExtracted);
}

#[rstest]
#[case::single_point(1)]
#[case::fewer_than_min_cluster_size(4)]
fn tiny_datasets_are_noise(#[case] rows: usize) {
    let data: Vec<Vec<f64>> = (0..rows).map(|row| vec![row as f64, 0.0]).collect();
    let model = HdbscanBuilder::new()
        .with_allow_single_cluster(true)
        .build()
        .expect("valid configuration");
    model
        .fit(SampleMatrix::from_rows(&data).expect("valid data"))
        .expect("fit succeeds");
    assert_eq!(model.labels().expect("fitted"), vec![-1; rows]);
    assert_eq!(model.probabilities().expect("fitted"), vec![0.0; rows]);
    assert_eq!(model.mst().expect("fitted").len(), rows - 1);
}

#[test]
fn second_fit_is_a_no_op_and_refit_recomputes() {
    let model = HdbscanBuilder::new()
        .with_min_cluster_size(3)
        .build()
        .expect("valid configuration");
    model.fit(scenario_two()).expect("first fit");
    let first = model.labels().expect("fitted");

    let blobs = blob_samples(7, &CENTRES, 10);
    model.fit(blobs.clone()).expect("second fit");
    assert_eq!(model.labels().expect("fitted"), first);

    model.refit(blobs).expect("refit");
    assert_eq!(model.labels().expect("fitted").len(), 30);
    assert!(model.n_clusters().expect("fitted") >= 3);
}

#[test]
fn explicit_kd_algorithm_with_haversine_warns_and_uses_euclidean() {
    let model = HdbscanBuilder::new()
        .with_min_cluster_size(4)
        .with_metric(Metric::Haversine)
        .with_algorithm(Algorithm::PrimKdTree)
        .build()
        .expect("valid configuration");
    let fitted = model
        .fit(blob_samples(3, &CENTRES, 12))
        .expect("fit succeeds");
    assert_eq!(
        fitted.warnings(),
        &[FitWarning::MetricFallback {
            requested: Metric::Haversine,
            algorithm: Algorithm::PrimKdTree,
        }]
    );
    assert_eq!(fitted.metric(), Metric::Euclidean);
    assert_eq!(model.resolved_algorithm().expect("fitted"), Algorithm::PrimKdTree);
}

#[test]
fn haversine_rejects_three_features() {
    let model = HdbscanBuilder::new()
        .with_metric(Metric::Haversine)
        .build()
        .expect("valid configuration");
    let data = SampleMatrix::from_rows(&[vec![0.0, 0.0, 0.0], vec![0.1, 0.1, 0.1]])
        .expect("valid data");
    let error = model.fit(data).expect_err("haversine needs two features");
    assert_eq!(error.code().as_str(), "HDBSCAN_METRIC_FAILURE");
    assert_eq!(error.source_code(), Some("METRIC_DIMENSION_MISMATCH"));
    assert!(matches!(
        model.labels(),
        Err(HdbscanError::NotFitted { .. })
    ));
}

#[rstest]
#[case::generic(Algorithm::Generic)]
#[case::prim_kd(Algorithm::PrimKdTree)]
#[case::prim_ball(Algorithm::PrimBallTree)]
#[case::boruvka_kd(Algorithm::BoruvkaKdTree)]
#[case::boruvka_ball(Algorithm::BoruvkaBallTree)]
fn every_algorithm_separates_blobs(#[case] algorithm: Algorithm) {
    let model = HdbscanBuilder::new()
        .with_min_cluster_size(15)
        .with_algorithm(algorithm)
        .with_leaf_size(8)
        .with_execution_context(ExecutionContext::sequential())
        .build()
        .expect("valid configuration");
    let fitted = model
        .fit(blob_samples(11, &CENTRES, 40))
        .expect("fit succeeds");
    assert_eq!(fitted.algorithm(), algorithm);
    assert_eq!(fitted.labelling().n_clusters(), 3);
    let mut per_blob = Vec::new();
    for (blob, chunk) in fitted.labels().chunks(40).enumerate() {
        let mut distinct: Vec<i64> = chunk.iter().copied().filter(|&label| label >= 0).collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 1, "blob {blob} has labels {distinct:?}");
        per_blob.extend(distinct);
    }
    per_blob.sort_unstable();
    per_blob.dedup();
    assert_eq!(per_blob, vec![0, 1, 2]);
}

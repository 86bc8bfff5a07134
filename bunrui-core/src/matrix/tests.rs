//! Unit tests for the matrix containers.

use rstest::rstest;

use super::{DistanceMatrix, SampleMatrix};
use crate::{error::MatrixError, metric::Metric, parallel::ExecutionContext};

fn scenario_matrix() -> DistanceMatrix {
    DistanceMatrix::from_rows(&[
        vec![1.0, 2.0, 3.0],
        vec![4.0, 5.0, 6.0],
        vec![7.0, 8.0, 9.0],
    ])
    .expect("square matrix")
}

#[rstest]
#[case::empty(Vec::<Vec<f64>>::new(), MatrixError::Empty)]
#[case::zero_dimension(vec![vec![]], MatrixError::ZeroDimension)]
#[case::ragged(
    vec![vec![0.0, 1.0], vec![2.0]],
    MatrixError::Ragged { row: 1, expected: 2, actual: 1 },
)]
#[case::nan(vec![vec![0.0, 1.0], vec![f64::NAN, 0.0]], MatrixError::NonFinite { row: 1, column: 0 })]
#[case::infinite(vec![vec![0.0, f64::INFINITY]], MatrixError::NonFinite { row: 0, column: 1 })]
fn sample_matrix_rejects_invalid_rows(#[case] rows: Vec<Vec<f64>>, #[case] expected: MatrixError) {
    let err = SampleMatrix::from_rows(&rows).expect_err("rows must be rejected");
    assert_eq!(err, expected);
}

#[test]
fn from_flat_checks_length() {
    let err = SampleMatrix::from_flat(2, 2, vec![0.0; 3]).expect_err("length mismatch");
    assert_eq!(err, MatrixError::LengthMismatch { expected: 4, actual: 3 });
    assert_eq!(err.code().as_str(), "MATRIX_LENGTH_MISMATCH");
}

#[test]
fn sample_rows_are_addressable() {
    let samples = SampleMatrix::from_flat(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])
        .expect("valid matrix");
    assert_eq!(samples.row(2), &[4.0, 5.0]);
    assert_eq!(samples.get_row(3), None);
    assert_eq!(samples.iter_rows().len(), 3);
}

#[test]
fn distance_matrix_must_be_square() {
    let err = DistanceMatrix::from_rows(&[vec![0.0, 1.0, 2.0], vec![1.0, 0.0, 3.0]])
        .expect_err("not square");
    assert_eq!(err, MatrixError::NotSquare { rows: 2, cols: 3 });
}

#[rstest]
#[case::first_order(1, vec![4.0, 5.0, 6.0])]
#[case::saturated(3, vec![7.0, 8.0, 9.0])]
#[case::larger_than_size(10, vec![7.0, 8.0, 9.0])]
fn core_distances_read_columns(#[case] min_samples: usize, #[case] expected: Vec<f64>) {
    assert_eq!(scenario_matrix().core_distances(min_samples), expected);
}

#[test]
fn mutual_reachability_takes_pairwise_maximum() {
    let reachability = scenario_matrix().mutual_reachability(3);
    assert_eq!(reachability.row(0), &[7.0, 8.0, 9.0]);
    assert_eq!(reachability.row(1), &[8.0, 8.0, 9.0]);
    assert_eq!(reachability.row(2), &[9.0, 9.0, 9.0]);
}

#[test]
fn alpha_scales_raw_distances() {
    let matrix = DistanceMatrix::from_rows(&[vec![0.0, 4.0], vec![4.0, 0.0]]).expect("square");
    let reachability = matrix.mutual_reachability_with_core(&[1.0, 1.0], 2.0);
    assert_eq!(reachability.get(0, 1), 2.0);
    assert_eq!(reachability.get(0, 0), 1.0);
}

#[rstest]
#[case::sequential(ExecutionContext::sequential())]
#[case::parallel(ExecutionContext::force_parallel())]
fn pairwise_distances_match_metric(#[case] context: ExecutionContext) {
    let rows: Vec<Vec<f64>> = (0..37_u32)
        .map(|i| vec![f64::from(i), f64::from(i % 5)])
        .collect();
    let samples = SampleMatrix::from_rows(&rows).expect("valid samples");
    let matrix = DistanceMatrix::from_samples(&samples, &Metric::Manhattan, &context);
    for i in 0..samples.rows() {
        for j in 0..samples.rows() {
            let expected = (rows[i][0] - rows[j][0]).abs() + (rows[i][1] - rows[j][1]).abs();
            assert_eq!(matrix.get(i, j), expected, "entry ({i}, {j})");
        }
    }
}

#[cfg(feature = "serde")]
#[rstest]
#[case::short_buffer(
    r#"{"data":[1.0],"rows":70,"cols":2}"#,
    MatrixError::LengthMismatch { expected: 140, actual: 1 },
)]
#[case::no_rows(r#"{"data":[],"rows":0,"cols":2}"#, MatrixError::Empty)]
#[case::no_columns(r#"{"data":[],"rows":3,"cols":0}"#, MatrixError::ZeroDimension)]
fn deserialised_samples_are_validated(#[case] json: &str, #[case] expected: MatrixError) {
    let error = serde_json::from_str::<SampleMatrix>(json).expect_err("matrix must be rejected");
    assert!(error.to_string().contains(&expected.to_string()), "{error}");
}

#[cfg(feature = "serde")]
#[test]
fn samples_survive_json() {
    let samples = SampleMatrix::from_rows(&[vec![0.5, 1.0], vec![-2.0, 3.25]]).expect("valid rows");
    let json = serde_json::to_string(&samples).expect("serialise samples");
    let restored: SampleMatrix = serde_json::from_str(&json).expect("deserialise samples");
    assert_eq!(restored, samples);
}

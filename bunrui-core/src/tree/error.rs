//! Errors raised while building or querying a spatial tree.

use thiserror::Error;

use crate::error::{MatrixError, MetricError, define_error_codes};

/// Configuration and shape errors for tree construction and queries.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TreeError {
    /// Leaf size must be at least one.
    #[error("leaf_size must be at least 1 (got {got})")]
    InvalidLeafSize {
        /// The rejected value.
        got: usize,
    },
    /// `k` must lie in `1..=available`.
    #[error("k must be between 1 and {available} (got {k})")]
    InvalidK {
        /// Requested neighbour count.
        k: usize,
        /// Number of indexed samples.
        available: usize,
    },
    /// Radii must be finite and non-negative.
    #[error("radius must be finite and >= 0 (got {radius})")]
    InvalidRadius {
        /// The rejected radius.
        radius: f64,
    },
    /// Bandwidth must be finite and strictly positive.
    #[error("bandwidth must be finite and > 0 (got {bandwidth})")]
    InvalidBandwidth {
        /// The rejected bandwidth.
        bandwidth: f64,
    },
    /// Tolerances must be finite and non-negative.
    #[error("tolerances must be finite and >= 0 (atol {atol}, rtol {rtol})")]
    InvalidTolerance {
        /// Absolute tolerance.
        atol: f64,
        /// Relative tolerance.
        rtol: f64,
    },
    /// Query points had a different feature count from the indexed data.
    #[error("query has {actual} features but the tree indexes {expected}")]
    DimensionMismatch {
        /// Feature count of the indexed data.
        expected: usize,
        /// Feature count of the query.
        actual: usize,
    },
    /// A snapshot failed structural validation.
    #[error("invalid tree snapshot: {reason}")]
    InvalidSnapshot {
        /// What failed validation.
        reason: String,
    },
    /// The metric was rejected.
    #[error(transparent)]
    Metric(#[from] MetricError),
    /// Indexed or query data failed validation.
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

define_error_codes! {
    /// Stable codes describing [`TreeError`] variants.
    enum TreeErrorCode for TreeError {
        /// Leaf size must be at least one.
        InvalidLeafSize => InvalidLeafSize { .. } => "TREE_INVALID_LEAF_SIZE",
        /// `k` was out of range.
        InvalidK => InvalidK { .. } => "TREE_INVALID_K",
        /// A radius was negative or not finite.
        InvalidRadius => InvalidRadius { .. } => "TREE_INVALID_RADIUS",
        /// A bandwidth was not strictly positive.
        InvalidBandwidth => InvalidBandwidth { .. } => "TREE_INVALID_BANDWIDTH",
        /// A tolerance was negative or not finite.
        InvalidTolerance => InvalidTolerance { .. } => "TREE_INVALID_TOLERANCE",
        /// Query dimensionality differed from the indexed data.
        DimensionMismatch => DimensionMismatch { .. } => "TREE_DIMENSION_MISMATCH",
        /// A snapshot failed validation.
        InvalidSnapshot => InvalidSnapshot { .. } => "TREE_INVALID_SNAPSHOT",
        /// The metric was rejected.
        Metric => Metric(..) => "TREE_METRIC_FAILURE",
        /// Data failed validation.
        Matrix => Matrix(..) => "TREE_MATRIX_FAILURE",
    }
}

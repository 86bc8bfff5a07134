//! Error types for the bunrui core library.
//!
//! Each subsystem owns a small error enum with a stable machine-readable
//! code. [`HdbscanError`] aggregates them for the model surface and
//! [`Result`] is the convenient alias used by the public API.

use thiserror::Error;

use crate::{hdbscan::FitStage, hierarchy::HierarchyError, mst::MstError, tree::TreeError};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident
                    $( { $($pattern:tt)* } )?
                    $( ( $($tuple:tt)* ) )?
                    => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl ::std::fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

pub(crate) use define_error_codes;

/// Data errors raised while validating a sample or distance matrix.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum MatrixError {
    /// The matrix contained no rows.
    #[error("matrix contains no rows")]
    Empty,
    /// Rows must have at least one column.
    #[error("matrix rows must have positive dimension")]
    ZeroDimension,
    /// A row length differed from the first row.
    #[error("row {row} has {actual} columns but {expected} were expected")]
    Ragged {
        /// Offending row.
        row: usize,
        /// Column count of the first row.
        expected: usize,
        /// Column count observed on `row`.
        actual: usize,
    },
    /// A value was NaN or infinite.
    #[error("value at ({row}, {column}) is not finite")]
    NonFinite {
        /// Row of the offending value.
        row: usize,
        /// Column of the offending value.
        column: usize,
    },
    /// A distance matrix must be square.
    #[error("distance matrix must be square (got {rows}x{cols})")]
    NotSquare {
        /// Number of rows supplied.
        rows: usize,
        /// Number of columns supplied.
        cols: usize,
    },
    /// A flat buffer did not match the declared shape.
    #[error("buffer has {actual} values but the shape requires {expected}")]
    LengthMismatch {
        /// `rows * cols`.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`MatrixError`] variants.
    enum MatrixErrorCode for MatrixError {
        /// The matrix contained no rows.
        Empty => Empty => "MATRIX_EMPTY",
        /// Rows must have at least one column.
        ZeroDimension => ZeroDimension => "MATRIX_ZERO_DIMENSION",
        /// A row length differed from the first row.
        Ragged => Ragged { .. } => "MATRIX_RAGGED",
        /// A value was NaN or infinite.
        NonFinite => NonFinite { .. } => "MATRIX_NON_FINITE",
        /// A distance matrix must be square.
        NotSquare => NotSquare { .. } => "MATRIX_NOT_SQUARE",
        /// A flat buffer did not match the declared shape.
        LengthMismatch => LengthMismatch { .. } => "MATRIX_LENGTH_MISMATCH",
    }
}

/// Errors raised when a metric is misconfigured or used where it is not
/// supported.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MetricError {
    /// Minkowski power must be finite and at least one.
    #[error("minkowski power must be finite and >= 1 (got {p})")]
    InvalidMinkowskiPower {
        /// The rejected power.
        p: f64,
    },
    /// The metric cannot drive the requested tree type.
    #[error("metric `{metric}` is not supported by {tree}")]
    UnsupportedForTree {
        /// Name of the rejected metric.
        metric: &'static str,
        /// Name of the tree type.
        tree: &'static str,
    },
    /// The metric requires a fixed dimensionality.
    #[error("metric `{metric}` requires {expected} features (got {actual})")]
    DimensionMismatch {
        /// Name of the metric.
        metric: &'static str,
        /// Required feature count.
        expected: usize,
        /// Feature count of the data.
        actual: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`MetricError`] variants.
    enum MetricErrorCode for MetricError {
        /// Minkowski power must be finite and at least one.
        InvalidMinkowskiPower => InvalidMinkowskiPower { .. } => "METRIC_INVALID_MINKOWSKI_POWER",
        /// The metric cannot drive the requested tree type.
        UnsupportedForTree => UnsupportedForTree { .. } => "METRIC_UNSUPPORTED_FOR_TREE",
        /// The metric requires a fixed dimensionality.
        DimensionMismatch => DimensionMismatch { .. } => "METRIC_DIMENSION_MISMATCH",
    }
}

/// Error type produced when configuring, fitting, or reading an
/// [`crate::Hdbscan`] model.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HdbscanError {
    /// Minimum cluster size must be greater than zero.
    #[error("min_cluster_size must be at least 1 (got {got})")]
    InvalidMinClusterSize {
        /// The rejected value.
        got: usize,
    },
    /// Minimum samples must be greater than zero.
    #[error("min_samples must be at least 1 (got {got})")]
    InvalidMinSamples {
        /// The rejected value.
        got: usize,
    },
    /// Alpha must be finite and strictly positive.
    #[error("alpha must be finite and > 0 (got {got})")]
    InvalidAlpha {
        /// The rejected value.
        got: f64,
    },
    /// Leaf size must be greater than zero.
    #[error("leaf_size must be at least 1 (got {got})")]
    InvalidLeafSize {
        /// The rejected value.
        got: usize,
    },
    /// An accessor was called before the model finished fitting.
    #[error("model is not fitted (current stage: {stage})")]
    NotFitted {
        /// Stage the model had reached when the accessor was called.
        stage: FitStage,
    },
    /// Input data failed validation.
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    /// The metric was rejected.
    #[error(transparent)]
    Metric(#[from] MetricError),
    /// Tree construction or querying failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// Minimum spanning tree construction failed.
    #[error(transparent)]
    Mst(#[from] MstError),
    /// Hierarchy extraction failed.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    /// A synchronisation primitive became poisoned after a panic.
    #[error("lock for {resource} is poisoned")]
    LockPoisoned {
        /// Name of the poisoned resource.
        resource: &'static str,
    },
}

define_error_codes! {
    /// Stable codes describing [`HdbscanError`] variants.
    enum HdbscanErrorCode for HdbscanError {
        /// Minimum cluster size must be greater than zero.
        InvalidMinClusterSize => InvalidMinClusterSize { .. } => "HDBSCAN_INVALID_MIN_CLUSTER_SIZE",
        /// Minimum samples must be greater than zero.
        InvalidMinSamples => InvalidMinSamples { .. } => "HDBSCAN_INVALID_MIN_SAMPLES",
        /// Alpha must be finite and strictly positive.
        InvalidAlpha => InvalidAlpha { .. } => "HDBSCAN_INVALID_ALPHA",
        /// Leaf size must be greater than zero.
        InvalidLeafSize => InvalidLeafSize { .. } => "HDBSCAN_INVALID_LEAF_SIZE",
        /// An accessor was called before fitting completed.
        NotFitted => NotFitted { .. } => "HDBSCAN_NOT_FITTED",
        /// Input data failed validation.
        Matrix => Matrix(..) => "HDBSCAN_MATRIX_FAILURE",
        /// The metric was rejected.
        Metric => Metric(..) => "HDBSCAN_METRIC_FAILURE",
        /// Tree construction or querying failed.
        Tree => Tree(..) => "HDBSCAN_TREE_FAILURE",
        /// Minimum spanning tree construction failed.
        Mst => Mst(..) => "HDBSCAN_MST_FAILURE",
        /// Hierarchy extraction failed.
        Hierarchy => Hierarchy(..) => "HDBSCAN_HIERARCHY_FAILURE",
        /// A synchronisation primitive became poisoned.
        LockPoisoned => LockPoisoned { .. } => "HDBSCAN_LOCK_POISONED",
    }
}

impl HdbscanError {
    /// Retrieve the code of the wrapped subsystem error, when there is one.
    #[must_use]
    pub const fn source_code(&self) -> Option<&'static str> {
        match self {
            Self::Matrix(error) => Some(error.code().as_str()),
            Self::Metric(error) => Some(error.code().as_str()),
            Self::Tree(error) => Some(error.code().as_str()),
            Self::Mst(error) => Some(error.code().as_str()),
            Self::Hierarchy(error) => Some(error.code().as_str()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the model API.
pub type Result<T> = core::result::Result<T, HdbscanError>;

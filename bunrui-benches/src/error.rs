//! Benchmark setup error type.
//!
//! Aggregates the failures that may arise while preparing benchmark inputs
//! so that setup functions can propagate them with `?` instead of using
//! `.expect()`.

use crate::source::SyntheticError;
use bunrui_core::{HdbscanError, MatrixError, MstError, TreeError};

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic data generation failed.
    #[error("synthetic data generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// The generated rows did not form a valid sample matrix.
    #[error("sample matrix rejected: {0}")]
    Matrix(#[from] MatrixError),
    /// Building or querying a spatial tree failed.
    #[error("spatial tree operation failed: {0}")]
    Tree(#[from] TreeError),
    /// Spanning tree construction failed.
    #[error("MST computation failed: {0}")]
    Mst(#[from] MstError),
    /// Model configuration or fitting failed.
    #[error("HDBSCAN fit failed: {0}")]
    Hdbscan(#[from] HdbscanError),
    /// A neighbour row came back without a `min_samples`-th entry.
    #[error("missing core distance for row {row}")]
    MissingCoreDistance {
        /// The row whose neighbour list was short.
        row: usize,
    },
}

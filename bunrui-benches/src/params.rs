//! Benchmark parameter types.
//!
//! Groups related benchmark parameters into structs so that Criterion ids
//! render consistently across groups.

use std::fmt;

/// Parameters for a neighbour query benchmark run.
#[derive(Clone, Debug)]
pub struct QueryBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Neighbours requested per query.
    pub k: usize,
}

impl fmt::Display for QueryBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},k={}", self.point_count, self.k)
    }
}

/// Parameters for a spanning tree benchmark run.
#[derive(Clone, Debug)]
pub struct PipelineBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
}

impl fmt::Display for PipelineBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={}", self.point_count)
    }
}

/// Parameters for a full model fit benchmark run.
#[derive(Clone, Debug)]
pub struct FitBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Minimum cluster size handed to the model.
    pub min_cluster_size: usize,
}

impl fmt::Display for FitBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},min={}", self.point_count, self.min_cluster_size)
    }
}

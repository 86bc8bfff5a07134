//! Per-node geometric bounds.

use std::fmt;

use super::{NodeData, TreeError};
use crate::{
    matrix::SampleMatrix,
    metric::{DistanceMetric, Metric},
};

/// Geometry a tree stores for each node.
///
/// Lower bounds must never exceed the true minimum distance from a point
/// (or another node) to any sample in the node, and upper bounds must never
/// fall below the true maximum. "Reduced" variants are expressed in the
/// metric's partial-distance space.
pub trait NodeBounds: Clone + fmt::Debug + Send + Sync + Sized {
    /// Human-readable tree name used in errors and spans.
    const NAME: &'static str;

    /// Whether these bounds are valid under `metric`.
    fn supports(metric: &Metric) -> bool;

    /// Storage for `n_nodes` nodes over `n_features` dimensions.
    fn allocate(n_nodes: usize, n_features: usize) -> Self;

    /// Fits the bounds of `node` around `indices` and returns the node
    /// radius.
    fn init_node(
        &mut self,
        node: usize,
        data: &SampleMatrix,
        indices: &[usize],
        metric: &Metric,
    ) -> f64;

    /// Reduced lower bound from `point` to the node.
    fn min_rdist(&self, node: usize, info: &NodeData, point: &[f64], metric: &Metric) -> f64;

    /// Lower bound from `point` to the node.
    fn min_dist(&self, node: usize, info: &NodeData, point: &[f64], metric: &Metric) -> f64;

    /// Upper bound from `point` to the node.
    fn max_dist(&self, node: usize, info: &NodeData, point: &[f64], metric: &Metric) -> f64;

    /// Reduced lower bound between `node1` of `self` and `node2` of `other`.
    fn min_rdist_dual(
        &self,
        node1: usize,
        info1: &NodeData,
        other: &Self,
        node2: usize,
        info2: &NodeData,
        metric: &Metric,
    ) -> f64;

    /// Lower bound between `node1` of `self` and `node2` of `other`.
    fn min_dist_dual(
        &self,
        node1: usize,
        info1: &NodeData,
        other: &Self,
        node2: usize,
        info2: &NodeData,
        metric: &Metric,
    ) -> f64 {
        metric.partial_to_distance(self.min_rdist_dual(node1, info1, other, node2, info2, metric))
    }

    /// Flattened bounds for snapshots.
    fn to_flat(&self) -> Vec<f64>;

    /// Rebuilds bounds from [`Self::to_flat`] output.
    ///
    /// # Errors
    /// Returns [`TreeError::InvalidSnapshot`] when the buffer length does not
    /// match the tree shape or holds non-finite values.
    fn from_flat(n_nodes: usize, n_features: usize, values: Vec<f64>) -> Result<Self, TreeError>;
}

pub(super) fn check_flat(values: &[f64], expected: usize, name: &str) -> Result<(), TreeError> {
    if values.len() != expected {
        return Err(TreeError::InvalidSnapshot {
            reason: format!("{name} holds {} values, expected {expected}", values.len()),
        });
    }
    if values.iter().any(|value| !value.is_finite()) {
        return Err(TreeError::InvalidSnapshot {
            reason: format!("{name} contains non-finite values"),
        });
    }
    Ok(())
}

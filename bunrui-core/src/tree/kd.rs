//! Axis-aligned bounding boxes.

use super::{
    NodeData, TreeError,
    bounds::{NodeBounds, check_flat},
};
use crate::{
    matrix::SampleMatrix,
    metric::{DistanceMetric, Metric},
};

/// Per-node lower and upper corners.
#[derive(Clone, Debug, PartialEq)]
pub struct KdBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
    n_features: usize,
}

impl KdBounds {
    /// Lower corner of `node`.
    #[must_use]
    pub fn lower(&self, node: usize) -> &[f64] {
        &self.lower[node * self.n_features..(node + 1) * self.n_features]
    }

    /// Upper corner of `node`.
    #[must_use]
    pub fn upper(&self, node: usize) -> &[f64] {
        &self.upper[node * self.n_features..(node + 1) * self.n_features]
    }

    fn corners(&self, node: usize) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lower(node).iter().copied().zip(self.upper(node).iter().copied())
    }
}

impl NodeBounds for KdBounds {
    const NAME: &'static str = "kd_tree";

    fn supports(metric: &Metric) -> bool {
        metric.supports_kd_tree()
    }

    fn allocate(n_nodes: usize, n_features: usize) -> Self {
        Self {
            lower: vec![0.0; n_nodes * n_features],
            upper: vec![0.0; n_nodes * n_features],
            n_features,
        }
    }

    fn init_node(
        &mut self,
        node: usize,
        data: &SampleMatrix,
        indices: &[usize],
        metric: &Metric,
    ) -> f64 {
        let span = node * self.n_features..(node + 1) * self.n_features;
        let lower = &mut self.lower[span.clone()];
        let upper = &mut self.upper[span];
        lower.fill(f64::INFINITY);
        upper.fill(f64::NEG_INFINITY);
        for &index in indices {
            for ((lo, hi), &value) in lower.iter_mut().zip(upper.iter_mut()).zip(data.row(index)) {
                *lo = lo.min(value);
                *hi = hi.max(value);
            }
        }
        let half_widths = lower.iter().zip(upper.iter()).map(|(lo, hi)| 0.5 * (hi - lo));
        metric.partial_to_distance(metric.reduce_gaps(half_widths))
    }

    fn min_rdist(&self, node: usize, _info: &NodeData, point: &[f64], metric: &Metric) -> f64 {
        metric.reduce_gaps(
            self.corners(node)
                .zip(point)
                .map(|((lo, hi), &x)| (lo - x).max(x - hi).max(0.0)),
        )
    }

    fn min_dist(&self, node: usize, info: &NodeData, point: &[f64], metric: &Metric) -> f64 {
        metric.partial_to_distance(self.min_rdist(node, info, point, metric))
    }

    fn max_dist(&self, node: usize, _info: &NodeData, point: &[f64], metric: &Metric) -> f64 {
        let reduced = metric.reduce_gaps(
            self.corners(node)
                .zip(point)
                .map(|((lo, hi), &x)| (x - lo).abs().max((x - hi).abs())),
        );
        metric.partial_to_distance(reduced)
    }

    fn min_rdist_dual(
        &self,
        node1: usize,
        _info1: &NodeData,
        other: &Self,
        node2: usize,
        _info2: &NodeData,
        metric: &Metric,
    ) -> f64 {
        metric.reduce_gaps(
            self.corners(node1)
                .zip(other.corners(node2))
                .map(|((lo1, hi1), (lo2, hi2))| (lo1 - hi2).max(lo2 - hi1).max(0.0)),
        )
    }

    fn to_flat(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.lower.len() * 2);
        flat.extend_from_slice(&self.lower);
        flat.extend_from_slice(&self.upper);
        flat
    }

    fn from_flat(n_nodes: usize, n_features: usize, mut values: Vec<f64>) -> Result<Self, TreeError> {
        let half = n_nodes * n_features;
        check_flat(&values, 2 * half, "kd bounds")?;
        let upper = values.split_off(half);
        Ok(Self {
            lower: values,
            upper,
            n_features,
        })
    }
}

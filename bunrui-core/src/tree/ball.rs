//! Centroid-and-radius bounds.

use super::{
    NodeData, TreeError,
    bounds::{NodeBounds, check_flat},
};
use crate::{
    matrix::SampleMatrix,
    metric::{DistanceMetric, Metric},
};

/// Per-node centroids; radii live in [`NodeData`].
#[derive(Clone, Debug, PartialEq)]
pub struct BallBounds {
    centroids: Vec<f64>,
    n_features: usize,
}

impl BallBounds {
    /// Centroid of `node`.
    #[must_use]
    pub fn centroid(&self, node: usize) -> &[f64] {
        &self.centroids[node * self.n_features..(node + 1) * self.n_features]
    }
}

impl NodeBounds for BallBounds {
    const NAME: &'static str = "ball_tree";

    fn supports(metric: &Metric) -> bool {
        metric.supports_ball_tree()
    }

    fn allocate(n_nodes: usize, n_features: usize) -> Self {
        Self {
            centroids: vec![0.0; n_nodes * n_features],
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
        let centroid = &mut self.centroids[span];
        centroid.fill(0.0);
        for &index in indices {
            for (sum, &value) in centroid.iter_mut().zip(data.row(index)) {
                *sum += value;
            }
        }
        let count = indices.len().max(1) as f64;
        for sum in centroid.iter_mut() {
            *sum /= count;
        }
        let centroid = &*centroid;
        indices
            .iter()
            .map(|&index| metric.distance(centroid, data.row(index)))
            .fold(0.0, f64::max)
    }

    fn min_rdist(&self, node: usize, info: &NodeData, point: &[f64], metric: &Metric) -> f64 {
        metric.distance_to_partial(self.min_dist(node, info, point, metric))
    }

    fn min_dist(&self, node: usize, info: &NodeData, point: &[f64], metric: &Metric) -> f64 {
        (metric.distance(point, self.centroid(node)) - info.radius).max(0.0)
    }

    fn max_dist(&self, node: usize, info: &NodeData, point: &[f64], metric: &Metric) -> f64 {
        metric.distance(point, self.centroid(node)) + info.radius
    }

    fn min_rdist_dual(
        &self,
        node1: usize,
        info1: &NodeData,
        other: &Self,
        node2: usize,
        info2: &NodeData,
        metric: &Metric,
    ) -> f64 {
        metric.distance_to_partial(self.min_dist_dual(node1, info1, other, node2, info2, metric))
    }

    fn min_dist_dual(
        &self,
        node1: usize,
        info1: &NodeData,
        other: &Self,
        node2: usize,
        info2: &NodeData,
        metric: &Metric,
    ) -> f64 {
        let between = metric.distance(self.centroid(node1), other.centroid(node2));
        (between - info1.radius - info2.radius).max(0.0)
    }

    fn to_flat(&self) -> Vec<f64> {
        self.centroids.clone()
    }

    fn from_flat(n_nodes: usize, n_features: usize, values: Vec<f64>) -> Result<Self, TreeError> {
        check_flat(&values, n_nodes * n_features, "ball centroids")?;
        Ok(Self {
            centroids: values,
            n_features,
        })
    }
}

//! KD-tree and Ball-tree spatial indexes.
//!
//! Both trees share one implementation, [`BinaryTree`], parameterised by the
//! per-node geometry ([`KdBounds`] or [`BallBounds`]). Nodes live in an
//! implicit complete binary layout: node `i` has children `2i + 1` and
//! `2i + 2`. Construction only permutes `index_array`; the samples are never
//! copied or reordered.

mod ball;
mod bounds;
mod brute;
mod error;
mod heap;
mod kd;
mod kde;
mod knn;
mod radius;
mod snapshot;

use tracing::{debug, instrument};

pub use self::{
    ball::BallBounds,
    bounds::NodeBounds,
    brute::{BruteForce, NearestNeighbors, NeighborsAlgorithm},
    error::{TreeError, TreeErrorCode},
    heap::{HeapRow, NeighborsHeap, NodeHeap, NodeHeapEntry},
    kd::KdBounds,
    kde::{KdeOptions, Kernel},
    knn::{KnnOptions, Neighborhood},
    snapshot::TreeSnapshot,
};
use crate::{
    error::MetricError,
    matrix::SampleMatrix,
    metric::{DistanceMetric, Metric},
    parallel::ExecutionContext,
    telemetry,
};

/// KD-tree over axis-aligned bounding boxes.
pub type KdTree = BinaryTree<KdBounds>;

/// Ball-tree over centroid-and-radius bounds.
///
/// Nodes split like KD nodes, at the median of the dimension with the
/// largest spread, rather than around two far-apart pivots. Each node's
/// ball is still fitted to its own points, so the bounds stay tight under
/// any metric the tree accepts, including Haversine.
pub type BallTree = BinaryTree<BallBounds>;

/// Index range and radius of a tree node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeData {
    /// First position in `index_array`.
    pub start: usize,
    /// One past the last position in `index_array`.
    pub end: usize,
    /// Whether the node has no children.
    pub is_leaf: bool,
    /// Radius of the node's region under the tree metric.
    pub radius: f64,
}

impl NodeData {
    /// Number of samples in the node.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the node covers no samples.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Query surface shared by the trees and brute-force search.
pub trait SpatialTree: Send + Sync {
    /// Number of indexed samples.
    fn n_samples(&self) -> usize;

    /// Feature count of the indexed samples.
    fn n_features(&self) -> usize;

    /// Metric used for every distance.
    fn metric(&self) -> Metric;

    /// The `k` nearest indexed samples for every row of `points`.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`] for queries of the wrong
    /// width and [`TreeError::InvalidK`] unless `1 <= k <= n_samples`.
    fn query(
        &self,
        points: &SampleMatrix,
        k: usize,
        options: KnnOptions,
    ) -> Result<Neighborhood, TreeError>;

    /// Every indexed sample within `radius` of each row of `points`.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`] or
    /// [`TreeError::InvalidRadius`].
    fn query_radius(
        &self,
        points: &SampleMatrix,
        radius: f64,
        sort: bool,
    ) -> Result<Neighborhood, TreeError>;

    /// Number of indexed samples within `radius` of each row of `points`.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`] or
    /// [`TreeError::InvalidRadius`].
    fn query_radius_count(&self, points: &SampleMatrix, radius: f64)
    -> Result<Vec<usize>, TreeError>;

    /// Kernel density estimate at each row of `points`.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`],
    /// [`TreeError::InvalidBandwidth`] or [`TreeError::InvalidTolerance`].
    fn kernel_density(
        &self,
        points: &SampleMatrix,
        bandwidth: f64,
        kernel: Kernel,
        options: KdeOptions,
    ) -> Result<Vec<f64>, TreeError>;

    /// For each radius, the number of `(query, sample)` pairs within it.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`] or
    /// [`TreeError::InvalidRadius`].
    fn two_point_correlation(
        &self,
        points: &SampleMatrix,
        radii: &[f64],
    ) -> Result<Vec<usize>, TreeError>;
}

/// Binary space-partitioning tree over an owned sample matrix.
///
/// # Examples
/// ```
/// use bunrui_core::{KdTree, KnnOptions, Metric, SampleMatrix};
///
/// let data = SampleMatrix::from_rows(&[
///     vec![0.0, 0.0],
///     vec![1.0, 0.0],
///     vec![5.0, 5.0],
///     vec![6.0, 5.0],
/// ])?;
/// let tree = KdTree::build(data, 1, Metric::Euclidean)?;
/// let query = SampleMatrix::from_rows(&[vec![0.9, 0.1]])?;
/// let neighbours = tree.query(&query, 2, KnnOptions::default())?;
/// assert_eq!(neighbours.indices()[0], vec![1, 0]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct BinaryTree<B: NodeBounds> {
    data: SampleMatrix,
    index_array: Vec<usize>,
    node_data: Vec<NodeData>,
    bounds: B,
    leaf_size: usize,
    n_levels: usize,
    metric: Metric,
    context: ExecutionContext,
}

impl<B: NodeBounds> BinaryTree<B> {
    /// Builds a tree over `data`.
    ///
    /// # Errors
    /// Returns [`TreeError::InvalidLeafSize`] when `leaf_size == 0` and
    /// [`TreeError::Metric`] when the metric is invalid, unsupported by these
    /// bounds, or incompatible with the data's dimensionality.
    #[instrument(
        name = "tree.build",
        err,
        skip(data),
        fields(tree = B::NAME, rows = data.rows(), cols = data.cols(), metric = metric.name()),
    )]
    pub fn build(data: SampleMatrix, leaf_size: usize, metric: Metric) -> Result<Self, TreeError> {
        if leaf_size == 0 {
            return Err(TreeError::InvalidLeafSize { got: leaf_size });
        }
        let metric = metric.validate()?;
        if !B::supports(&metric) {
            return Err(MetricError::UnsupportedForTree {
                metric: metric.name(),
                tree: B::NAME,
            }
            .into());
        }
        metric.check_dimension(data.cols())?;

        let n_levels = level_count(data.rows(), leaf_size);
        let n_nodes = (1_usize << n_levels) - 1;
        let mut tree = Self {
            index_array: (0..data.rows()).collect(),
            node_data: vec![NodeData::default(); n_nodes],
            bounds: B::allocate(n_nodes, data.cols()),
            data,
            leaf_size,
            n_levels,
            metric,
            context: ExecutionContext::default(),
        };
        tree.build_node(0, 0, tree.data.rows());
        debug!(n_levels, n_nodes, "tree built");
        telemetry::record_tree_build();
        Ok(tree)
    }

    /// Runs batched queries under `context`.
    #[must_use]
    pub fn with_execution_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    fn build_node(&mut self, node: usize, start: usize, end: usize) {
        let radius = self.bounds.init_node(
            node,
            &self.data,
            &self.index_array[start..end],
            &self.metric,
        );
        let len = end - start;
        let (left, right) = children(node);
        let is_leaf = len <= self.leaf_size || left >= self.node_data.len();
        self.node_data[node] = NodeData {
            start,
            end,
            is_leaf,
            radius,
        };
        if is_leaf {
            return;
        }
        let data = &self.data;
        let slice = &mut self.index_array[start..end];
        let dimension = max_spread_dimension(data, slice);
        let mid = len / 2;
        slice.select_nth_unstable_by(mid, |&a, &b| {
            data.row(a)[dimension].total_cmp(&data.row(b)[dimension])
        });
        self.build_node(left, start, start + mid);
        self.build_node(right, start + mid, end);
    }

    /// Indexed samples.
    #[must_use]
    #[rustfmt::skip]
    pub fn data(&self) -> &SampleMatrix { &self.data }

    /// Permutation of sample ids; every node covers a contiguous range.
    #[must_use]
    #[rustfmt::skip]
    pub fn index_array(&self) -> &[usize] { &self.index_array }

    /// Per-node ranges and radii.
    #[must_use]
    #[rustfmt::skip]
    pub fn node_data(&self) -> &[NodeData] { &self.node_data }

    /// Per-node geometry.
    #[must_use]
    #[rustfmt::skip]
    pub fn bounds(&self) -> &B { &self.bounds }

    /// Depth of the implicit layout.
    #[must_use]
    #[rustfmt::skip]
    pub fn n_levels(&self) -> usize { self.n_levels }

    /// Number of node slots (`2^n_levels - 1`).
    #[must_use]
    #[rustfmt::skip]
    pub fn n_nodes(&self) -> usize { self.node_data.len() }

    /// Maximum number of samples a leaf may hold.
    #[must_use]
    #[rustfmt::skip]
    pub fn leaf_size(&self) -> usize { self.leaf_size }

    /// Metric used by the tree.
    #[must_use]
    #[rustfmt::skip]
    pub fn metric(&self) -> Metric { self.metric }

    /// Context used for batched queries.
    #[must_use]
    #[rustfmt::skip]
    pub fn execution_context(&self) -> ExecutionContext { self.context }

    /// Number of indexed samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.rows()
    }

    /// Feature count of the indexed samples.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.data.cols()
    }

    /// Sample ids covered by `node`.
    ///
    /// # Panics
    /// Panics when `node` is out of range.
    #[must_use]
    pub fn node_indices(&self, node: usize) -> &[usize] {
        let info = &self.node_data[node];
        &self.index_array[info.start..info.end]
    }

    /// Reduced lower bound from `point` to `node`.
    ///
    /// # Panics
    /// Panics when `node` is out of range.
    #[must_use]
    pub fn min_rdist(&self, node: usize, point: &[f64]) -> f64 {
        self.bounds
            .min_rdist(node, &self.node_data[node], point, &self.metric)
    }

    /// Lower bound from `point` to `node`.
    ///
    /// # Panics
    /// Panics when `node` is out of range.
    #[must_use]
    pub fn min_dist(&self, node: usize, point: &[f64]) -> f64 {
        self.bounds
            .min_dist(node, &self.node_data[node], point, &self.metric)
    }

    /// Upper bound from `point` to `node`.
    ///
    /// # Panics
    /// Panics when `node` is out of range.
    #[must_use]
    pub fn max_dist(&self, node: usize, point: &[f64]) -> f64 {
        self.bounds
            .max_dist(node, &self.node_data[node], point, &self.metric)
    }

    /// Reduced lower bound between `node1` of this tree and `node2` of
    /// `other`.
    ///
    /// # Panics
    /// Panics when either node is out of range.
    #[must_use]
    pub fn min_rdist_dual(&self, node1: usize, other: &Self, node2: usize) -> f64 {
        self.bounds.min_rdist_dual(
            node1,
            &self.node_data[node1],
            &other.bounds,
            node2,
            &other.node_data[node2],
            &self.metric,
        )
    }

    /// Lower bound between `node1` of this tree and `node2` of `other`.
    ///
    /// # Panics
    /// Panics when either node is out of range.
    #[must_use]
    pub fn min_dist_dual(&self, node1: usize, other: &Self, node2: usize) -> f64 {
        self.bounds.min_dist_dual(
            node1,
            &self.node_data[node1],
            &other.bounds,
            node2,
            &other.node_data[node2],
            &self.metric,
        )
    }

    fn check_points(&self, points: &SampleMatrix) -> Result<(), TreeError> {
        if points.cols() == self.data.cols() {
            Ok(())
        } else {
            Err(TreeError::DimensionMismatch {
                expected: self.data.cols(),
                actual: points.cols(),
            })
        }
    }
}

impl<B: NodeBounds> SpatialTree for BinaryTree<B> {
    fn n_samples(&self) -> usize {
        self.data.rows()
    }

    fn n_features(&self) -> usize {
        self.data.cols()
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn query(
        &self,
        points: &SampleMatrix,
        k: usize,
        options: KnnOptions,
    ) -> Result<Neighborhood, TreeError> {
        Self::query(self, points, k, options)
    }

    fn query_radius(
        &self,
        points: &SampleMatrix,
        radius: f64,
        sort: bool,
    ) -> Result<Neighborhood, TreeError> {
        Self::query_radius(self, points, radius, sort)
    }

    fn query_radius_count(
        &self,
        points: &SampleMatrix,
        radius: f64,
    ) -> Result<Vec<usize>, TreeError> {
        Self::query_radius_count(self, points, radius)
    }

    fn kernel_density(
        &self,
        points: &SampleMatrix,
        bandwidth: f64,
        kernel: Kernel,
        options: KdeOptions,
    ) -> Result<Vec<f64>, TreeError> {
        Self::kernel_density(self, points, bandwidth, kernel, options)
    }

    fn two_point_correlation(
        &self,
        points: &SampleMatrix,
        radii: &[f64],
    ) -> Result<Vec<usize>, TreeError> {
        Self::two_point_correlation(self, points, radii)
    }
}

/// Children of `node` in the implicit layout.
#[must_use]
pub(crate) const fn children(node: usize) -> (usize, usize) {
    (2 * node + 1, 2 * node + 2)
}

/// Smallest level count whose deepest nodes hold at most `leaf_size`
/// samples.
fn level_count(rows: usize, leaf_size: usize) -> usize {
    let mut capacity = rows.max(1);
    let mut levels = 1;
    while capacity > leaf_size {
        capacity = capacity.div_ceil(2);
        levels += 1;
    }
    levels
}

fn max_spread_dimension(data: &SampleMatrix, indices: &[usize]) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for dimension in 0..data.cols() {
        let (low, high) = indices.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(low, high), &index| {
                let value = data.row(index)[dimension];
                (low.min(value), high.max(value))
            },
        );
        if high - low > best.1 {
            best = (dimension, high - low);
        }
    }
    best.0
}

fn check_radius(radius: f64) -> Result<(), TreeError> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(TreeError::InvalidRadius { radius })
    }
}

#[cfg(test)]
mod tests;

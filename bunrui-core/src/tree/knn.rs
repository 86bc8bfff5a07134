//! k-nearest-neighbour traversals.

use tracing::instrument;

use super::{
    BinaryTree, NodeBounds, NodeData, TreeError, children,
    heap::{HeapRow, NeighborsHeap, NodeHeap, NodeHeapEntry},
};
use crate::{matrix::SampleMatrix, metric::DistanceMetric};

/// Traversal strategy for k-NN queries.
///
/// # Examples
/// ```
/// use bunrui_core::KnnOptions;
///
/// let options = KnnOptions::default().with_dual_tree(true);
/// assert!(options.dual_tree());
/// assert!(!options.breadth_first());
/// assert!(options.sorted());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnnOptions {
    dual_tree: bool,
    breadth_first: bool,
    sort: bool,
}

impl Default for KnnOptions {
    fn default() -> Self {
        Self {
            dual_tree: false,
            breadth_first: false,
            sort: true,
        }
    }
}

impl KnnOptions {
    /// Builds a tree over the queries and traverses both trees together.
    #[must_use]
    pub const fn with_dual_tree(mut self, dual_tree: bool) -> Self {
        self.dual_tree = dual_tree;
        self
    }

    /// Expands nodes in order of their lower bound instead of depth-first.
    #[must_use]
    pub const fn with_breadth_first(mut self, breadth_first: bool) -> Self {
        self.breadth_first = breadth_first;
        self
    }

    /// Sorts each result row by ascending distance.
    #[must_use]
    pub const fn with_sorted(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Whether dual-tree traversal is enabled.
    #[must_use]
    #[rustfmt::skip]
    pub const fn dual_tree(&self) -> bool { self.dual_tree }

    /// Whether breadth-first traversal is enabled.
    #[must_use]
    #[rustfmt::skip]
    pub const fn breadth_first(&self) -> bool { self.breadth_first }

    /// Whether rows are sorted.
    #[must_use]
    #[rustfmt::skip]
    pub const fn sorted(&self) -> bool { self.sort }
}

/// Per-query neighbour rows; row lengths may differ for radius queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Neighborhood {
    distances: Vec<Vec<f64>>,
    indices: Vec<Vec<usize>>,
}

impl Neighborhood {
    pub(crate) fn new(distances: Vec<Vec<f64>>, indices: Vec<Vec<usize>>) -> Self {
        debug_assert_eq!(distances.len(), indices.len(), "one row per query");
        Self { distances, indices }
    }

    pub(crate) fn from_flat(distances: &[f64], indices: &[usize], k: usize) -> Self {
        if k == 0 {
            return Self::default();
        }
        Self {
            distances: distances.chunks_exact(k).map(<[f64]>::to_vec).collect(),
            indices: indices.chunks_exact(k).map(<[usize]>::to_vec).collect(),
        }
    }

    /// Distances per query row.
    #[must_use]
    #[rustfmt::skip]
    pub fn distances(&self) -> &[Vec<f64>] { &self.distances }

    /// Sample ids per query row.
    #[must_use]
    #[rustfmt::skip]
    pub fn indices(&self) -> &[Vec<usize>] { &self.indices }

    /// Number of query rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether there are no query rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Distances and ids of query `row`.
    #[must_use]
    pub fn row(&self, row: usize) -> Option<(&[f64], &[usize])> {
        Some((self.distances.get(row)?, self.indices.get(row)?))
    }

    /// Splits into `(distances, indices)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Vec<f64>>, Vec<Vec<usize>>) {
        (self.distances, self.indices)
    }
}

impl<B: NodeBounds> BinaryTree<B> {
    /// Finds the `k` nearest samples for every row of `points`.
    ///
    /// Single-tree queries are chunked over query rows through the tree's
    /// execution context. Dual-tree queries build a tree of the same kind
    /// over `points` and traverse node pairs.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`] for queries of the wrong
    /// width and [`TreeError::InvalidK`] unless `1 <= k <= n_samples`.
    #[instrument(
        name = "tree.query",
        err,
        skip(self, points),
        fields(tree = B::NAME, queries = points.rows(), dual_tree = options.dual_tree(), breadth_first = options.breadth_first()),
    )]
    pub fn query(
        &self,
        points: &SampleMatrix,
        k: usize,
        options: KnnOptions,
    ) -> Result<Neighborhood, TreeError> {
        self.check_points(points)?;
        if k == 0 || k > self.n_samples() {
            return Err(TreeError::InvalidK {
                k,
                available: self.n_samples(),
            });
        }
        let mut heap = NeighborsHeap::new(points.rows(), k);
        if options.dual_tree() {
            let query_tree = Self::build(points.clone(), self.leaf_size, self.metric)?;
            let mut bounds = vec![f64::INFINITY; query_tree.n_nodes()];
            if options.breadth_first() {
                self.dual_breadth_first(&query_tree, &mut bounds, &mut heap);
            } else {
                let lower = self.min_rdist_dual(0, &query_tree, 0);
                self.dual_depth_first(0, &query_tree, 0, &mut bounds, &mut heap, lower);
            }
        } else {
            let breadth_first = options.breadth_first();
            let (distances, indices) = heap.buffers_mut();
            self.context
                .for_each_row_chunk_pair(distances, k, indices, k, |first_row, dist, idx| {
                    let mut queue = NodeHeap::default();
                    let rows = dist.chunks_exact_mut(k).zip(idx.chunks_exact_mut(k));
                    for (offset, (row_distances, row_indices)) in rows.enumerate() {
                        let point = points.row(first_row + offset);
                        let mut row = HeapRow::new(row_distances, row_indices);
                        if breadth_first {
                            self.single_breadth_first(point, &mut row, &mut queue);
                        } else {
                            let lower = self.min_rdist(0, point);
                            self.single_depth_first(0, point, &mut row, lower);
                        }
                    }
                });
        }
        let (distances, indices) = if options.sorted() {
            heap.into_sorted()
        } else {
            heap.into_raw()
        };
        let distances: Vec<f64> = distances
            .into_iter()
            .map(|reduced| self.metric.partial_to_distance(reduced))
            .collect();
        Ok(Neighborhood::from_flat(&distances, &indices, k))
    }

    fn scan_leaf(&self, info: &NodeData, point: &[f64], row: &mut HeapRow<'_>) {
        for &index in &self.index_array[info.start..info.end] {
            row.push(self.metric.partial_distance(point, self.data.row(index)), index);
        }
    }

    fn single_depth_first(&self, node: usize, point: &[f64], row: &mut HeapRow<'_>, lower: f64) {
        if lower > row.largest() {
            return;
        }
        let info = self.node_data[node];
        if info.is_leaf {
            self.scan_leaf(&info, point, row);
            return;
        }
        let (left, right) = children(node);
        let lower_left = self.min_rdist(left, point);
        let lower_right = self.min_rdist(right, point);
        if lower_left <= lower_right {
            self.single_depth_first(left, point, row, lower_left);
            self.single_depth_first(right, point, row, lower_right);
        } else {
            self.single_depth_first(right, point, row, lower_right);
            self.single_depth_first(left, point, row, lower_left);
        }
    }

    fn single_breadth_first(&self, point: &[f64], row: &mut HeapRow<'_>, queue: &mut NodeHeap) {
        queue.clear();
        queue.push(NodeHeapEntry {
            val: self.min_rdist(0, point),
            i1: 0,
            i2: 0,
        });
        while let Some(entry) = queue.pop() {
            if entry.val > row.largest() {
                break;
            }
            let info = self.node_data[entry.i1];
            if info.is_leaf {
                self.scan_leaf(&info, point, row);
                continue;
            }
            let (left, right) = children(entry.i1);
            for child in [left, right] {
                queue.push(NodeHeapEntry {
                    val: self.min_rdist(child, point),
                    i1: child,
                    i2: 0,
                });
            }
        }
    }

    /// Scans a leaf pair and stores the refreshed bound of `node2`: the
    /// largest retained distance over every query point in it.
    fn dual_scan_leaves(
        &self,
        info1: &NodeData,
        queries: &Self,
        node2: usize,
        bounds: &mut [f64],
        heap: &mut NeighborsHeap,
        lower: f64,
    ) {
        let info2 = queries.node_data[node2];
        let mut bound = 0.0_f64;
        for &query in &queries.index_array[info2.start..info2.end] {
            if heap.largest(query) > lower {
                let point = queries.data.row(query);
                self.scan_leaf(info1, point, &mut heap.row_mut(query));
            }
            bound = bound.max(heap.largest(query));
        }
        bounds[node2] = bound;
        propagate_bounds(bounds, node2);
    }

    fn dual_depth_first(
        &self,
        node1: usize,
        queries: &Self,
        node2: usize,
        bounds: &mut [f64],
        heap: &mut NeighborsHeap,
        lower: f64,
    ) {
        if lower > bounds[node2] {
            return;
        }
        let info1 = self.node_data[node1];
        let info2 = queries.node_data[node2];
        if info1.is_leaf && info2.is_leaf {
            self.dual_scan_leaves(&info1, queries, node2, bounds, heap, lower);
        } else if split_query_node(&info1, &info2) {
            let (left, right) = children(node2);
            let lower_left = self.min_rdist_dual(node1, queries, left);
            let lower_right = self.min_rdist_dual(node1, queries, right);
            if lower_left < lower_right {
                self.dual_depth_first(node1, queries, left, bounds, heap, lower_left);
                self.dual_depth_first(node1, queries, right, bounds, heap, lower_right);
            } else {
                self.dual_depth_first(node1, queries, right, bounds, heap, lower_right);
                self.dual_depth_first(node1, queries, left, bounds, heap, lower_left);
            }
        } else {
            let (left, right) = children(node1);
            let lower_left = self.min_rdist_dual(left, queries, node2);
            let lower_right = self.min_rdist_dual(right, queries, node2);
            if lower_left < lower_right {
                self.dual_depth_first(left, queries, node2, bounds, heap, lower_left);
                self.dual_depth_first(right, queries, node2, bounds, heap, lower_right);
            } else {
                self.dual_depth_first(right, queries, node2, bounds, heap, lower_right);
                self.dual_depth_first(left, queries, node2, bounds, heap, lower_left);
            }
        }
    }

    fn dual_breadth_first(&self, queries: &Self, bounds: &mut [f64], heap: &mut NeighborsHeap) {
        let mut queue = NodeHeap::default();
        queue.push(NodeHeapEntry {
            val: self.min_rdist_dual(0, queries, 0),
            i1: 0,
            i2: 0,
        });
        while let Some(NodeHeapEntry { val, i1, i2 }) = queue.pop() {
            if val > bounds[i2] {
                continue;
            }
            let info1 = self.node_data[i1];
            let info2 = queries.node_data[i2];
            if info1.is_leaf && info2.is_leaf {
                self.dual_scan_leaves(&info1, queries, i2, bounds, heap, val);
            } else if split_query_node(&info1, &info2) {
                let (left, right) = children(i2);
                for child in [left, right] {
                    queue.push(NodeHeapEntry {
                        val: self.min_rdist_dual(i1, queries, child),
                        i1,
                        i2: child,
                    });
                }
            } else {
                let (left, right) = children(i1);
                for child in [left, right] {
                    queue.push(NodeHeapEntry {
                        val: self.min_rdist_dual(child, queries, i2),
                        i1: child,
                        i2,
                    });
                }
            }
        }
    }
}

/// Splits the query node when the reference node cannot be split, or when
/// the query node is the larger of two internal nodes.
fn split_query_node(reference: &NodeData, query: &NodeData) -> bool {
    reference.is_leaf || (!query.is_leaf && query.radius > reference.radius)
}

/// Tightens ancestor bounds while both children allow it.
fn propagate_bounds(bounds: &mut [f64], mut node: usize) {
    while node > 0 {
        let parent = (node - 1) / 2;
        let (left, right) = children(parent);
        let child_bound = bounds[left].max(bounds[right]);
        if child_bound < bounds[parent] {
            bounds[parent] = child_bound;
            node = parent;
        } else {
            break;
        }
    }
}

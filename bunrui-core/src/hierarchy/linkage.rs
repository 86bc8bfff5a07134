//! Size-augmented single-linkage dendrograms.

use super::HierarchyError;
use crate::{
    mst::{MinimumSpanningTree, MstEdge},
    union_find::UnionFind,
};

/// One merge of the dendrogram.
///
/// Ids below the point count are points; merge `i` creates id `n + i`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkageRow {
    /// Representative of the first merged set.
    pub left: usize,
    /// Representative of the second merged set.
    pub right: usize,
    /// Merge distance.
    pub distance: f64,
    /// Number of points in the merged set.
    pub size: usize,
}

/// A dendrogram over `n` points with `n - 1` merges.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SingleLinkageTree {
    rows: Vec<LinkageRow>,
}

impl SingleLinkageTree {
    /// Sorts the tree's edges by weight and labels them.
    ///
    /// # Errors
    /// Propagates the validation errors of [`label_linkage`].
    pub fn from_mst(mst: &MinimumSpanningTree) -> Result<Self, HierarchyError> {
        label_linkage(mst.sorted().edges())
    }

    /// Merge rows in order.
    #[must_use]
    #[rustfmt::skip]
    pub fn rows(&self) -> &[LinkageRow] { &self.rows }

    /// Number of points (one more than the merge count).
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.rows.len() + 1
    }

    /// Id of the final merge, or of the only point when there are no merges.
    #[must_use]
    pub fn root(&self) -> usize {
        2 * self.rows.len()
    }

    /// Number of points under `node`.
    ///
    /// # Panics
    /// Panics when `node` is not a valid id.
    #[must_use]
    pub fn size_of(&self, node: usize) -> usize {
        match node.checked_sub(self.n_points()) {
            Some(merge) => self.rows[merge].size,
            None => 1,
        }
    }

    /// Children of a merge node, or `None` for a point.
    #[must_use]
    pub fn children(&self, node: usize) -> Option<(usize, usize)> {
        let merge = node.checked_sub(self.n_points())?;
        self.rows.get(merge).map(|row| (row.left, row.right))
    }

    /// Ids under `node` in breadth-first order, `node` first.
    #[must_use]
    pub fn descendants(&self, node: usize) -> Vec<usize> {
        let mut order = vec![node];
        let mut cursor = 0;
        while let Some(&current) = order.get(cursor) {
            if let Some((left, right)) = self.children(current) {
                order.extend([left, right]);
            }
            cursor += 1;
        }
        order
    }
}

/// Labels edges into dendrogram rows, in the order given.
///
/// Each edge merges the current sets of its endpoints into a fresh id and
/// records the merged size. Callers normally pass edges sorted by weight.
///
/// # Errors
/// Returns [`HierarchyError::InvalidEdgeWeight`] for a NaN or negative
/// weight, [`HierarchyError::InvalidEdge`] for an endpoint outside
/// `0..=edges.len()` and [`HierarchyError::Cycle`] when an edge joins points
/// that are already connected.
///
/// # Examples
/// ```
/// use bunrui_core::{MstEdge, label_linkage};
///
/// let tree = label_linkage(&[MstEdge::new(0, 2, 0.3), MstEdge::new(2, 1, 0.6)])?;
/// let rows: Vec<_> = tree
///     .rows()
///     .iter()
///     .map(|row| (row.left, row.right, row.distance, row.size))
///     .collect();
/// assert_eq!(rows, vec![(0, 2, 0.3, 2), (3, 1, 0.6, 3)]);
/// # Ok::<(), bunrui_core::HierarchyError>(())
/// ```
pub fn label_linkage(edges: &[MstEdge]) -> Result<SingleLinkageTree, HierarchyError> {
    let node_count = edges.len() + 1;
    let mut forest = UnionFind::new(node_count);
    let mut rows = Vec::with_capacity(edges.len());
    for edge in edges {
        let (source, target, weight) = (edge.source(), edge.target(), edge.weight());
        if weight.is_nan() || weight < 0.0 {
            return Err(HierarchyError::InvalidEdgeWeight {
                left: source,
                right: target,
                weight,
            });
        }
        for node in [source, target] {
            if node >= node_count {
                return Err(HierarchyError::InvalidEdge { node, node_count });
            }
        }
        let left = forest.fast_find(source);
        let right = forest.fast_find(target);
        if left == right {
            return Err(HierarchyError::Cycle {
                left: source,
                right: target,
            });
        }
        let size = forest.size_of(left) + forest.size_of(right);
        forest.union(left, right)?;
        rows.push(LinkageRow {
            left,
            right,
            distance: weight,
            size,
        });
    }
    Ok(SingleLinkageTree { rows })
}

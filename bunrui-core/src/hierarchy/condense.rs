//! Condensing a dendrogram with a minimum cluster size.

use std::num::NonZeroUsize;

use super::{SingleLinkageTree, lambda_of};

/// One row of the condensed tree.
///
/// `child` is a point when it is below [`CondensedTree::root`], otherwise a
/// cluster born from `parent` at `lambda`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CondensedRow {
    /// Cluster the child leaves.
    pub parent: usize,
    /// Point id or child cluster id.
    pub child: usize,
    /// `1 / distance` at which the child leaves the parent.
    pub lambda: f64,
    /// Points carried by the child.
    pub child_size: usize,
}

impl CondensedRow {
    /// Whether the child is a cluster of at least two points.
    #[must_use]
    pub const fn is_cluster_row(&self, n_points: usize) -> bool {
        self.child >= n_points && self.child_size > 1
    }
}

/// Cluster hierarchy left after condensing.
///
/// Cluster ids start at the point count, which is the root.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CondensedTree {
    rows: Vec<CondensedRow>,
    n_points: usize,
}

impl CondensedTree {
    /// Rebuilds a tree from previously captured rows.
    #[must_use]
    pub const fn from_rows(rows: Vec<CondensedRow>, n_points: usize) -> Self {
        Self { rows, n_points }
    }

    /// Rows in breadth-first order of their parent.
    #[must_use]
    #[rustfmt::skip]
    pub fn rows(&self) -> &[CondensedRow] { &self.rows }

    /// Number of points in the dataset.
    #[must_use]
    #[rustfmt::skip]
    pub fn n_points(&self) -> usize { self.n_points }

    /// Id of the root cluster.
    #[must_use]
    #[rustfmt::skip]
    pub fn root(&self) -> usize { self.n_points }

    /// Whether no rows were produced (a single point).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose child is a cluster of at least two points.
    pub fn cluster_rows(&self) -> impl Iterator<Item = &CondensedRow> {
        self.rows
            .iter()
            .filter(|row| row.is_cluster_row(self.n_points))
    }

    /// Largest id used by any row, or the root when there are none.
    #[must_use]
    pub fn max_id(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.parent.max(row.child))
            .fold(self.root(), usize::max)
    }
}

/// Condenses `linkage` so that no cluster smaller than `min_cluster_size`
/// survives.
///
/// Nodes are visited breadth-first from the root. When both halves of a
/// split are large enough, each becomes a new cluster. When only one is, the
/// parent cluster continues into it and the points of the small half fall
/// out at the split's lambda. When neither is, every point falls out.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use bunrui_core::{MstEdge, condense_tree, label_linkage};
///
/// let linkage = label_linkage(&[MstEdge::new(0, 1, 0.5), MstEdge::new(1, 2, 2.0)])?;
/// let condensed = condense_tree(&linkage, NonZeroUsize::new(2).expect("non-zero"));
/// let rows: Vec<_> = condensed.rows().iter().map(|row| (row.parent, row.child)).collect();
/// assert_eq!(rows, vec![(3, 2), (3, 0), (3, 1)]);
/// # Ok::<(), bunrui_core::HierarchyError>(())
/// ```
#[must_use]
pub fn condense_tree(linkage: &SingleLinkageTree, min_cluster_size: NonZeroUsize) -> CondensedTree {
    let min_cluster_size = min_cluster_size.get();
    let n_points = linkage.n_points();
    let root = linkage.root();
    let mut relabel = vec![0_usize; root + 1];
    relabel[root] = n_points;
    let mut next_label = n_points + 1;
    let mut ignore = vec![false; root + 1];
    let mut rows = Vec::new();

    for node in linkage.descendants(root) {
        if ignore[node] {
            continue;
        }
        let Some((left, right)) = linkage.children(node) else {
            continue;
        };
        let lambda = lambda_of(linkage.rows()[node - n_points].distance);
        let parent = relabel[node];
        let left_size = linkage.size_of(left);
        let right_size = linkage.size_of(right);
        let left_big = left_size >= min_cluster_size;
        let right_big = right_size >= min_cluster_size;

        let mut fall_out = |subtree: usize, rows: &mut Vec<CondensedRow>| {
            for sub_node in linkage.descendants(subtree) {
                if sub_node < n_points {
                    rows.push(CondensedRow {
                        parent,
                        child: sub_node,
                        lambda,
                        child_size: 1,
                    });
                }
                ignore[sub_node] = true;
            }
        };

        match (left_big, right_big) {
            (true, true) => {
                for (child, size) in [(left, left_size), (right, right_size)] {
                    relabel[child] = next_label;
                    rows.push(CondensedRow {
                        parent,
                        child: next_label,
                        lambda,
                        child_size: size,
                    });
                    next_label += 1;
                }
            }
            (false, false) => {
                fall_out(left, &mut rows);
                fall_out(right, &mut rows);
            }
            (true, false) => {
                relabel[left] = parent;
                fall_out(right, &mut rows);
            }
            (false, true) => {
                relabel[right] = parent;
                fall_out(left, &mut rows);
            }
        }
    }
    CondensedTree { rows, n_points }
}

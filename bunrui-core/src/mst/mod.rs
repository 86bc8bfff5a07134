//! Minimum spanning tree construction over the mutual-reachability graph.
//!
//! Three builders produce the same total weight on the same input:
//! [`generic_prim`] runs dense Prim over a materialised matrix,
//! [`tree_prim`] grows a Prim frontier with pruned tree searches, and
//! [`boruvka`] merges components in data-parallel rounds. Edges are never
//! canonicalised; `source` is the vertex already in the tree (Prim) or the
//! searching component (Boruvka).

mod boruvka;
mod prim;
mod search;
mod tree_prim;

use std::cmp::Ordering;

use thiserror::Error;

pub use self::{boruvka::boruvka, prim::generic_prim, tree_prim::tree_prim};
pub(crate) use self::search::tree_core_distances;
use crate::{error::define_error_codes, tree::TreeError};

/// Errors returned while computing a minimum spanning tree.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MstError {
    /// The caller requested an MST for an empty graph.
    #[error("cannot compute an MST for an empty graph")]
    EmptyGraph,
    /// Core distances did not match the indexed samples.
    #[error("expected {expected} core distances but received {actual}")]
    DimensionMismatch {
        /// Number of indexed samples.
        expected: usize,
        /// Number of core distances supplied.
        actual: usize,
    },
    /// The search ran out of candidate edges before spanning every vertex.
    #[error("spanning tree reached {found} of {expected} vertices")]
    Disconnected {
        /// Vertices connected when the search stalled.
        found: usize,
        /// Total vertex count.
        expected: usize,
    },
    /// A neighbour query on the tree failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

define_error_codes! {
    /// Stable codes describing [`MstError`] variants.
    enum MstErrorCode for MstError {
        /// The graph was empty.
        EmptyGraph => EmptyGraph => "MST_EMPTY_GRAPH",
        /// Core distances did not match the samples.
        DimensionMismatch => DimensionMismatch { .. } => "MST_DIMENSION_MISMATCH",
        /// The graph could not be spanned.
        Disconnected => Disconnected { .. } => "MST_DISCONNECTED",
        /// A tree query failed.
        Tree => Tree(..) => "MST_TREE_FAILURE",
    }
}

/// A weighted spanning-tree edge.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MstEdge {
    source: usize,
    target: usize,
    weight: f64,
}

impl MstEdge {
    /// Creates an edge from `source` to `target`.
    #[must_use]
    pub const fn new(source: usize, target: usize, weight: f64) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }

    /// Endpoint already connected when the edge was chosen.
    #[must_use]
    #[rustfmt::skip]
    pub const fn source(&self) -> usize { self.source }

    /// Endpoint the edge brought into the tree.
    #[must_use]
    #[rustfmt::skip]
    pub const fn target(&self) -> usize { self.target }

    /// Mutual-reachability weight.
    #[must_use]
    #[rustfmt::skip]
    pub const fn weight(&self) -> f64 { self.weight }
}

impl Eq for MstEdge {}

impl Ord for MstEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.target.cmp(&other.target))
    }
}

impl PartialOrd for MstEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The `m - 1` edges spanning `m` samples.
///
/// # Examples
/// ```
/// use bunrui_core::{MinimumSpanningTree, MstEdge};
///
/// let tree = MinimumSpanningTree::new(vec![MstEdge::new(1, 2, 0.6), MstEdge::new(0, 2, 0.3)]);
/// assert!((tree.total_weight() - 0.9).abs() < 1e-12);
/// assert_eq!(tree.sorted().edges()[0], MstEdge::new(0, 2, 0.3));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinimumSpanningTree {
    edges: Vec<MstEdge>,
}

impl MinimumSpanningTree {
    /// Wraps edges in the order they were produced.
    #[must_use]
    pub const fn new(edges: Vec<MstEdge>) -> Self {
        Self { edges }
    }

    /// Edges in production order.
    #[must_use]
    #[rustfmt::skip]
    pub fn edges(&self) -> &[MstEdge] { &self.edges }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the tree has no edges (a single sample).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sum of edge weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(MstEdge::weight).sum()
    }

    /// The same edges, stably ordered by weight then endpoints.
    #[must_use]
    pub fn sorted(&self) -> Self {
        let mut edges = self.edges.clone();
        edges.sort();
        Self { edges }
    }

    /// Consumes the tree, returning its edges.
    #[must_use]
    pub fn into_edges(self) -> Vec<MstEdge> {
        self.edges
    }
}

/// Mutual-reachability weight for a raw distance.
pub(crate) fn reachability(core_a: f64, core_b: f64, distance: f64, alpha: f64) -> f64 {
    (distance / alpha).max(core_a).max(core_b)
}

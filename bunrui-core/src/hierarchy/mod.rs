//! Flat clustering from the mutual-reachability minimum spanning tree.
//!
//! The pipeline runs in fixed order:
//!
//! - [`SingleLinkageTree::from_mst`] sorts the MST edges and labels them
//!   into a size-augmented dendrogram.
//! - [`condense_tree`] walks the dendrogram top-down, letting a cluster
//!   continue through splits that shed fewer than `min_cluster_size` points.
//! - [`compute_stability`] scores every surviving cluster by its excess of
//!   mass.
//! - [`extract_clusters`] picks the flat clustering and [`assign_labels`]
//!   resolves each point to its nearest selected ancestor, or noise.
//!
//! Everything here is sequential and deterministic.

mod condense;
mod labels;
mod linkage;
mod selection;
mod stability;

use thiserror::Error;

pub use self::{
    condense::{CondensedRow, CondensedTree, condense_tree},
    labels::{Labelling, assign_labels, membership_probabilities, outlier_scores},
    linkage::{LinkageRow, SingleLinkageTree, label_linkage},
    selection::{ClusterSelection, extract_clusters},
    stability::compute_stability,
};
use crate::{
    error::define_error_codes,
    union_find::UnionFindError,
};

/// Errors returned by hierarchy extraction.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HierarchyError {
    /// Hierarchy extraction requires at least one point.
    #[error("cannot extract a hierarchy for an empty dataset")]
    EmptyDataset,
    /// An edge weight was negative or NaN.
    #[error("invalid edge weight {weight} for edge ({left}, {right})")]
    InvalidEdgeWeight {
        /// First endpoint of the offending edge.
        left: usize,
        /// Second endpoint of the offending edge.
        right: usize,
        /// The rejected weight.
        weight: f64,
    },
    /// An edge referenced a point outside the dataset.
    #[error("edge references node {node}, but node_count is {node_count}")]
    InvalidEdge {
        /// The out-of-range endpoint.
        node: usize,
        /// Number of points implied by the edge list.
        node_count: usize,
    },
    /// An edge joined two points that were already connected.
    #[error("edge ({left}, {right}) closes a cycle")]
    Cycle {
        /// First endpoint of the offending edge.
        left: usize,
        /// Second endpoint of the offending edge.
        right: usize,
    },
    /// The dendrogram union-find rejected a merge.
    #[error(transparent)]
    UnionFind(#[from] UnionFindError),
}

define_error_codes! {
    /// Stable codes describing [`HierarchyError`] variants.
    enum HierarchyErrorCode for HierarchyError {
        /// The dataset was empty.
        EmptyDataset => EmptyDataset => "HIERARCHY_EMPTY_DATASET",
        /// An edge weight was negative or NaN.
        InvalidEdgeWeight => InvalidEdgeWeight { .. } => "HIERARCHY_INVALID_EDGE_WEIGHT",
        /// An edge endpoint was out of range.
        InvalidEdge => InvalidEdge { .. } => "HIERARCHY_INVALID_EDGE",
        /// An edge closed a cycle.
        Cycle => Cycle { .. } => "HIERARCHY_CYCLE",
        /// The union-find rejected a merge.
        UnionFind => UnionFind(..) => "HIERARCHY_UNION_FIND_FAILURE",
    }
}

/// `1 / distance`, with zero distance mapping to `+inf`.
pub(crate) fn lambda_of(distance: f64) -> f64 {
    if distance > 0.0 {
        distance.recip()
    } else {
        f64::INFINITY
    }
}

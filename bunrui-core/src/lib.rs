//! Bunrui core library.
//!
//! Density-based clustering (HDBSCAN) over dense sample matrices, together
//! with the pieces it is built from: KD-tree and Ball-tree neighbour search
//! and kernel density estimation, minimum spanning tree builders over mutual
//! reachability, and the cluster hierarchy pipeline.
//!
//! # Examples
//! ```
//! use bunrui_core::{Hdbscan, SampleMatrix};
//!
//! let data = SampleMatrix::from_rows(&[
//!     vec![1.0, 1.0], vec![1.1, 1.0], vec![1.0, 1.1], vec![9.0, 9.0],
//! ])?;
//! let model = Hdbscan::builder().with_min_cluster_size(3).build()?;
//! model.fit(data)?;
//! assert_eq!(model.labels()?.len(), 4);
//! # Ok::<(), bunrui_core::HdbscanError>(())
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod hdbscan;
mod hierarchy;
mod matrix;
mod metric;
mod mst;
mod parallel;
mod telemetry;
mod tree;
mod union_find;

#[cfg(test)]
mod test_utils;

pub use crate::{
    error::{
        HdbscanError, HdbscanErrorCode, MatrixError, MatrixErrorCode, MetricError,
        MetricErrorCode, Result,
    },
    hdbscan::{
        Algorithm, FitStage, FitWarning, FittedModel, Hdbscan, HdbscanBuilder, HdbscanConfig,
        ModelSnapshot,
    },
    hierarchy::{
        ClusterSelection, CondensedRow, CondensedTree, HierarchyError, HierarchyErrorCode,
        Labelling, LinkageRow, SingleLinkageTree, assign_labels, compute_stability,
        condense_tree, extract_clusters, label_linkage, membership_probabilities,
        outlier_scores,
    },
    matrix::{DistanceMatrix, SampleMatrix},
    metric::{DistanceMetric, Metric},
    mst::{MinimumSpanningTree, MstEdge, MstError, MstErrorCode, boruvka, generic_prim, tree_prim},
    parallel::ExecutionContext,
    tree::{
        BallBounds, BallTree, BinaryTree, BruteForce, HeapRow, KdBounds, KdTree, KdeOptions,
        Kernel, KnnOptions, NearestNeighbors, NeighborsAlgorithm, NeighborsHeap, Neighborhood,
        NodeBounds, NodeData, NodeHeap, NodeHeapEntry, SpatialTree, TreeError, TreeErrorCode,
        TreeSnapshot,
    },
    union_find::{TreeUnionFind, UnionFind, UnionFindError, UnionFindErrorCode},
};

//! Dual-component Boruvka rounds over a spatial tree.

use std::cmp::Ordering;

use tracing::{debug, instrument};

use super::{
    MinimumSpanningTree, MstEdge, MstError,
    search::{Candidate, Exclusion, ReachabilitySearch, edge_order},
};
use crate::{
    parallel::ExecutionContext,
    tree::{BinaryTree, NodeBounds},
    union_find::TreeUnionFind,
};

/// Component of every sample, and of every node whose samples all share
/// one.
struct Components {
    point: Vec<usize>,
    node: Vec<Option<usize>>,
}

impl Components {
    fn snapshot<B: NodeBounds>(tree: &BinaryTree<B>, forest: &mut TreeUnionFind) -> Self {
        let point = (0..tree.n_samples()).map(|sample| forest.find(sample)).collect();
        let mut components = Self {
            point,
            node: vec![None; tree.n_nodes()],
        };
        components.label_node(tree, 0);
        components
    }

    fn label_node<B: NodeBounds>(&mut self, tree: &BinaryTree<B>, node: usize) -> Option<usize> {
        let info = tree.node_data()[node];
        let label = if info.is_leaf {
            let mut members = tree.node_indices(node).iter().map(|&sample| self.point[sample]);
            let first = members.next();
            first.filter(|&component| members.all(|other| other == component))
        } else {
            let left = self.label_node(tree, 2 * node + 1);
            let right = self.label_node(tree, 2 * node + 2);
            left.filter(|_| left == right)
        };
        self.node[node] = label;
        label
    }
}

impl Exclusion for Components {
    fn excludes_point(&self, origin: usize, candidate: usize) -> bool {
        self.point[origin] == self.point[candidate]
    }

    fn excludes_node(&self, origin: usize, node: usize) -> bool {
        self.node[node] == Some(self.point[origin])
    }
}

/// Builds the mutual-reachability minimum spanning tree with Boruvka's
/// algorithm.
///
/// Each round finds, for every sample, its cheapest edge into another
/// component (searches are chunked over `context`), reduces those to the
/// cheapest edge per component, then merges. Edges are ranked by weight and
/// then by endpoint pair, so the result does not depend on scheduling.
///
/// # Errors
/// Returns [`MstError::DimensionMismatch`] when `core_distances` does not
/// match the tree and [`MstError::Disconnected`] if a round adds no edge.
///
/// # Examples
/// ```
/// use bunrui_core::{BallTree, ExecutionContext, Metric, SampleMatrix, boruvka};
///
/// let data = SampleMatrix::from_rows(&[vec![0.0], vec![1.0], vec![3.0], vec![7.0]])?;
/// let tree = BallTree::build(data, 1, Metric::Euclidean)?;
/// let mst = boruvka(&tree, &[0.0; 4], 1.0, &ExecutionContext::default())?;
/// assert_eq!(mst.len(), 3);
/// assert_eq!(mst.total_weight(), 7.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[instrument(
    name = "mst.boruvka",
    err,
    skip(tree, core_distances, context),
    fields(tree = B::NAME, samples = tree.n_samples()),
)]
pub fn boruvka<B: NodeBounds>(
    tree: &BinaryTree<B>,
    core_distances: &[f64],
    alpha: f64,
    context: &ExecutionContext,
) -> Result<MinimumSpanningTree, MstError> {
    let samples = tree.n_samples();
    if samples == 0 {
        return Err(MstError::EmptyGraph);
    }
    let search = ReachabilitySearch::new(tree, core_distances, alpha)?;
    let mut forest = TreeUnionFind::new(samples);
    let mut edges = Vec::with_capacity(samples - 1);
    let mut round = 0_usize;

    while edges.len() + 1 < samples {
        round += 1;
        let components = Components::snapshot(tree, &mut forest);
        let nearest = context.map_rows(samples, |origin| search.nearest(origin, &components));

        let mut cheapest: Vec<Option<(usize, Candidate)>> = vec![None; samples];
        for (origin, found) in nearest.into_iter().enumerate() {
            let Some(found) = found else {
                continue;
            };
            let slot = &mut cheapest[components.point[origin]];
            let better = slot.is_none_or(|current| {
                edge_order((origin, found), current) == Ordering::Less
            });
            if better {
                *slot = Some((origin, found));
            }
        }

        let before = edges.len();
        for (origin, found) in cheapest.into_iter().flatten() {
            let source_root = forest.find(origin);
            let target_root = forest.find(found.target);
            if source_root != target_root {
                forest.union(source_root, target_root);
                edges.push(MstEdge::new(origin, found.target, found.weight));
            }
        }
        if edges.len() == before {
            return Err(MstError::Disconnected {
                found: edges.len() + 1,
                expected: samples,
            });
        }
        debug!(
            round,
            added = edges.len() - before,
            components = samples - edges.len(),
            "boruvka round complete"
        );
    }
    Ok(MinimumSpanningTree::new(edges))
}

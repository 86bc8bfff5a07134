//! Prim's algorithm with tree-pruned frontier searches.

use std::{cmp::Reverse, collections::BinaryHeap};

use tracing::instrument;

use super::{
    MinimumSpanningTree, MstEdge, MstError,
    search::{Candidate, Exclusion, ReachabilitySearch},
};
use crate::{
    parallel::ExecutionContext,
    tree::{BinaryTree, NodeBounds},
};

/// Samples already in the tree, with per-node counts of those still
/// outside it.
struct Visited {
    visited: Vec<bool>,
    outside: Vec<usize>,
    position: Vec<usize>,
}

impl Visited {
    fn new<B: NodeBounds>(tree: &BinaryTree<B>) -> Self {
        let mut position = vec![0; tree.n_samples()];
        for (slot, &index) in tree.index_array().iter().enumerate() {
            position[index] = slot;
        }
        Self {
            visited: vec![false; tree.n_samples()],
            outside: tree.node_data().iter().map(|info| info.len()).collect(),
            position,
        }
    }

    fn contains(&self, sample: usize) -> bool {
        self.visited[sample]
    }

    fn insert<B: NodeBounds>(&mut self, tree: &BinaryTree<B>, sample: usize) {
        self.visited[sample] = true;
        let slot = self.position[sample];
        let mut node = 0;
        loop {
            self.outside[node] -= 1;
            let info = tree.node_data()[node];
            if info.is_leaf {
                break;
            }
            let left = 2 * node + 1;
            node = if slot < tree.node_data()[left].end {
                left
            } else {
                left + 1
            };
        }
    }
}

impl Exclusion for Visited {
    fn excludes_point(&self, _origin: usize, candidate: usize) -> bool {
        self.visited[candidate]
    }

    fn excludes_node(&self, _origin: usize, node: usize) -> bool {
        self.outside[node] == 0
    }
}

struct Unrestricted;

impl Exclusion for Unrestricted {
    fn excludes_point(&self, _origin: usize, _candidate: usize) -> bool {
        false
    }

    fn excludes_node(&self, _origin: usize, _node: usize) -> bool {
        false
    }
}

/// Builds the mutual-reachability minimum spanning tree of the samples
/// indexed by `tree`.
///
/// Every vertex in the tree keeps exactly one candidate edge on a global
/// heap: its cheapest edge to a vertex outside the tree. A popped candidate
/// whose target has joined in the meantime is recomputed and pushed back.
/// Each vertex's unrestricted nearest neighbour is found up front, chunked
/// over `context`, and used as its first candidate.
///
/// # Errors
/// Returns [`MstError::DimensionMismatch`] when `core_distances` does not
/// match the tree and [`MstError::Disconnected`] if the frontier empties
/// early.
///
/// # Examples
/// ```
/// use bunrui_core::{ExecutionContext, KdTree, Metric, SampleMatrix, tree_prim};
///
/// let data = SampleMatrix::from_rows(&[vec![0.0], vec![1.0], vec![3.0], vec![7.0]])?;
/// let tree = KdTree::build(data, 1, Metric::Euclidean)?;
/// let mst = tree_prim(&tree, &[0.0; 4], 1.0, &ExecutionContext::sequential())?;
/// assert_eq!(mst.len(), 3);
/// assert_eq!(mst.total_weight(), 7.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[instrument(
    name = "mst.tree_prim",
    err,
    skip(tree, core_distances, context),
    fields(tree = B::NAME, samples = tree.n_samples()),
)]
pub fn tree_prim<B: NodeBounds>(
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
    let nearest = context.map_rows(samples, |origin| search.nearest(origin, &Unrestricted));

    let mut visited = Visited::new(search.tree());
    let mut frontier = BinaryHeap::new();
    let mut edges = Vec::with_capacity(samples - 1);
    let push = |frontier: &mut BinaryHeap<Reverse<MstEdge>>, source: usize, found: Candidate| {
        frontier.push(Reverse(MstEdge::new(source, found.target, found.weight)));
    };

    visited.insert(tree, 0);
    if let Some(found) = nearest[0] {
        push(&mut frontier, 0, found);
    }
    while edges.len() + 1 < samples {
        let Some(Reverse(edge)) = frontier.pop() else {
            return Err(MstError::Disconnected {
                found: edges.len() + 1,
                expected: samples,
            });
        };
        let source = edge.source();
        if !visited.contains(edge.target()) {
            let target = edge.target();
            visited.insert(tree, target);
            edges.push(edge);
            let cached = nearest[target].filter(|found| !visited.contains(found.target));
            if let Some(found) = cached.or_else(|| search.nearest(target, &visited)) {
                push(&mut frontier, target, found);
            }
        }
        if let Some(found) = search.nearest(source, &visited) {
            push(&mut frontier, source, found);
        }
    }
    Ok(MinimumSpanningTree::new(edges))
}

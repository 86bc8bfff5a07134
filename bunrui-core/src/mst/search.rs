//! Pruned nearest-neighbour search under mutual reachability.
//!
//! Both tree builders ask the same question: for sample `p`, which eligible
//! sample `q` minimises `max(core[p], core[q], d(p, q) / alpha)`? A node can
//! be skipped when `max(core[p], min core in node, min_dist / alpha)`
//! already exceeds the best weight found, or when the builder's
//! [`Exclusion`] rules out every sample it holds.
//!
//! Candidates are ranked by `(weight, min(p, q), max(p, q))`, a strict total
//! order on undirected edges, so every search has a unique answer.

use std::cmp::Ordering;

use super::{MstError, reachability};
use crate::{
    matrix::SampleMatrix,
    metric::DistanceMetric,
    tree::{BinaryTree, KnnOptions, NodeBounds},
};

/// Builder-specific eligibility rules.
pub(super) trait Exclusion: Sync {
    /// Whether `candidate` may not be joined to `origin`.
    fn excludes_point(&self, origin: usize, candidate: usize) -> bool;

    /// Whether no sample under `node` may be joined to `origin`.
    fn excludes_node(&self, origin: usize, node: usize) -> bool;
}

/// Best edge found for one origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Candidate {
    pub(super) target: usize,
    pub(super) weight: f64,
}

/// Tree plus the per-node data the reachability bound needs.
pub(super) struct ReachabilitySearch<'a, B: NodeBounds> {
    tree: &'a BinaryTree<B>,
    core: &'a [f64],
    alpha: f64,
    min_core: Vec<f64>,
}

impl<'a, B: NodeBounds> ReachabilitySearch<'a, B> {
    /// Prepares a search over `tree`.
    ///
    /// # Errors
    /// Returns [`MstError::DimensionMismatch`] when `core` does not hold one
    /// value per indexed sample.
    pub(super) fn new(
        tree: &'a BinaryTree<B>,
        core: &'a [f64],
        alpha: f64,
    ) -> Result<Self, MstError> {
        if core.len() != tree.n_samples() {
            return Err(MstError::DimensionMismatch {
                expected: tree.n_samples(),
                actual: core.len(),
            });
        }
        let min_core = tree
            .node_data()
            .iter()
            .map(|info| {
                tree.index_array()[info.start..info.end]
                    .iter()
                    .map(|&index| core[index])
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        Ok(Self {
            tree,
            core,
            alpha,
            min_core,
        })
    }

    pub(super) fn tree(&self) -> &'a BinaryTree<B> {
        self.tree
    }

    /// Cheapest eligible edge out of `origin`, if any sample is eligible.
    pub(super) fn nearest<E: Exclusion>(&self, origin: usize, exclusion: &E) -> Option<Candidate> {
        let point = self.tree.data().row(origin);
        let mut best = None;
        self.descend(0, origin, point, exclusion, &mut best);
        best
    }

    fn lower_bound(&self, node: usize, origin: usize, point: &[f64]) -> f64 {
        let distance = self.tree.min_dist(node, point);
        reachability(self.core[origin], self.min_core[node], distance, self.alpha)
    }

    fn descend<E: Exclusion>(
        &self,
        node: usize,
        origin: usize,
        point: &[f64],
        exclusion: &E,
        best: &mut Option<Candidate>,
    ) {
        if exclusion.excludes_node(origin, node) {
            return;
        }
        if let Some(found) = best
            && self.lower_bound(node, origin, point) > found.weight
        {
            return;
        }
        let info = self.tree.node_data()[node];
        if info.is_leaf {
            self.scan_leaf(node, origin, point, exclusion, best);
            return;
        }
        let left = 2 * node + 1;
        let right = left + 1;
        let left_bound = self.lower_bound(left, origin, point);
        let right_bound = self.lower_bound(right, origin, point);
        let (near, far) = if right_bound < left_bound {
            (right, left)
        } else {
            (left, right)
        };
        self.descend(near, origin, point, exclusion, best);
        self.descend(far, origin, point, exclusion, best);
    }

    fn scan_leaf<E: Exclusion>(
        &self,
        node: usize,
        origin: usize,
        point: &[f64],
        exclusion: &E,
        best: &mut Option<Candidate>,
    ) {
        let core_origin = self.core[origin];
        for &candidate in self.tree.node_indices(node) {
            if candidate == origin || exclusion.excludes_point(origin, candidate) {
                continue;
            }
            if let Some(found) = best
                && self.core[candidate] > found.weight
            {
                continue;
            }
            let distance = self
                .tree
                .metric()
                .distance(point, self.tree.data().row(candidate));
            let weight = reachability(core_origin, self.core[candidate], distance, self.alpha);
            let next = Candidate {
                target: candidate,
                weight,
            };
            if best.is_none_or(|found| rank(origin, next, found) == Ordering::Less) {
                *best = Some(next);
            }
        }
    }
}

/// Orders two candidate edges out of `origin` by weight, then by their
/// undirected endpoint pair.
pub(super) fn rank(origin: usize, a: Candidate, b: Candidate) -> Ordering {
    edge_order((origin, a), (origin, b))
}

/// Orders `(origin, candidate)` edges by weight, then by their undirected
/// endpoint pair.
pub(super) fn edge_order(a: (usize, Candidate), b: (usize, Candidate)) -> Ordering {
    let pair = |(origin, found): (usize, Candidate)| {
        (origin.min(found.target), origin.max(found.target))
    };
    a.1.weight
        .total_cmp(&b.1.weight)
        .then_with(|| pair(a).cmp(&pair(b)))
}

/// Core distances of every indexed sample: the distance to its
/// `min(min_samples, m - 1)`-th nearest neighbour, the sample itself
/// counted at position zero.
pub(crate) fn tree_core_distances<B: NodeBounds>(
    tree: &BinaryTree<B>,
    min_samples: usize,
) -> Result<Vec<f64>, MstError> {
    let samples: &SampleMatrix = tree.data();
    let k = min_samples.min(samples.rows().saturating_sub(1));
    let neighbours = tree.query(samples, k + 1, KnnOptions::default())?;
    Ok(neighbours
        .distances()
        .iter()
        .map(|row| row.last().copied().unwrap_or(0.0))
        .collect())
}

//! Dense Prim over a materialised mutual-reachability matrix.

use tracing::instrument;

use super::{MinimumSpanningTree, MstEdge, MstError};
use crate::matrix::DistanceMatrix;

/// Builds the minimum spanning tree of the complete graph described by
/// `reachability`.
///
/// The tree grows from vertex 0, keeping for every outside vertex the
/// cheapest edge into the tree. Edges are returned in insertion order with
/// `source` inside the tree. Runs in `O(m²)` time and `O(m)` extra space.
///
/// # Errors
/// Returns [`MstError::EmptyGraph`] for an empty matrix.
///
/// # Examples
/// ```
/// use bunrui_core::{DistanceMatrix, generic_prim};
///
/// let reachability = DistanceMatrix::from_rows(&[
///     vec![0.0, 0.6, 0.3],
///     vec![0.6, 0.0, 0.9],
///     vec![0.3, 0.9, 0.0],
/// ])?;
/// let tree = generic_prim(&reachability)?;
/// assert_eq!(tree.len(), 2);
/// assert!((tree.total_weight() - 0.9).abs() < 1e-12);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[instrument(
    name = "mst.generic_prim",
    err,
    skip(reachability),
    fields(size = reachability.size()),
)]
pub fn generic_prim(reachability: &DistanceMatrix) -> Result<MinimumSpanningTree, MstError> {
    let size = reachability.size();
    if size == 0 {
        return Err(MstError::EmptyGraph);
    }
    let mut in_tree = vec![false; size];
    let mut best_weight = vec![f64::INFINITY; size];
    let mut best_source = vec![0_usize; size];
    let mut edges = Vec::with_capacity(size - 1);
    let mut current = 0;
    in_tree[current] = true;

    for _ in 1..size {
        let row = reachability.row(current);
        let mut next: Option<usize> = None;
        for vertex in 0..size {
            if in_tree[vertex] {
                continue;
            }
            if row[vertex] < best_weight[vertex] {
                best_weight[vertex] = row[vertex];
                best_source[vertex] = current;
            }
            let closer = next.is_none_or(|chosen| best_weight[vertex] < best_weight[chosen]);
            if closer {
                next = Some(vertex);
            }
        }
        let Some(vertex) = next else {
            break;
        };
        in_tree[vertex] = true;
        edges.push(MstEdge::new(best_source[vertex], vertex, best_weight[vertex]));
        current = vertex;
    }
    Ok(MinimumSpanningTree::new(edges))
}

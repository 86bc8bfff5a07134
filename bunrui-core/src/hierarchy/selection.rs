//! Flat cluster selection over the condensed tree.

use std::collections::{BTreeMap, BTreeSet};

use super::CondensedTree;

/// Strategy for turning the cluster hierarchy into a flat clustering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ClusterSelection {
    /// Keep the most stable clusters, trading a parent against the summed
    /// stability of its children.
    #[default]
    ExcessOfMass,
    /// Keep the leaves of the cluster hierarchy.
    Leaf,
}

fn cluster_children(condensed: &CondensedTree) -> BTreeMap<usize, Vec<usize>> {
    let mut children: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for row in condensed.cluster_rows() {
        children.entry(row.parent).or_default().push(row.child);
    }
    children
}

fn descendants_of(children: &BTreeMap<usize, Vec<usize>>, cluster: usize) -> Vec<usize> {
    let mut pending = children.get(&cluster).cloned().unwrap_or_default();
    let mut found = Vec::new();
    while let Some(next) = pending.pop() {
        found.push(next);
        if let Some(grandchildren) = children.get(&next) {
            pending.extend(grandchildren);
        }
    }
    found
}

/// Selects the clusters that make up the flat clustering.
///
/// The root is only ever a candidate when `allow_single_cluster` is set.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use bunrui_core::{
///     ClusterSelection, MstEdge, compute_stability, condense_tree, extract_clusters,
///     label_linkage,
/// };
///
/// let linkage = label_linkage(&[
///     MstEdge::new(0, 1, 1.0),
///     MstEdge::new(2, 3, 1.0),
///     MstEdge::new(1, 2, 10.0),
/// ])?;
/// let condensed = condense_tree(&linkage, NonZeroUsize::new(2).expect("non-zero"));
/// let stability = compute_stability(&condensed);
/// let selected = extract_clusters(&condensed, &stability, ClusterSelection::ExcessOfMass, false);
/// assert_eq!(selected.into_iter().collect::<Vec<_>>(), vec![5, 6]);
/// # Ok::<(), bunrui_core::HierarchyError>(())
/// ```
#[must_use]
pub fn extract_clusters(
    condensed: &CondensedTree,
    stability: &BTreeMap<usize, f64>,
    selection: ClusterSelection,
    allow_single_cluster: bool,
) -> BTreeSet<usize> {
    let root = condensed.root();
    let children = cluster_children(condensed);
    let candidates: BTreeSet<usize> = stability
        .keys()
        .copied()
        .filter(|&cluster| cluster != root || allow_single_cluster)
        .collect();

    match selection {
        ClusterSelection::ExcessOfMass => {
            let mut scores = stability.clone();
            let mut selected = candidates.clone();
            for &cluster in candidates.iter().rev() {
                let subtree: f64 = children
                    .get(&cluster)
                    .into_iter()
                    .flatten()
                    .map(|child| scores.get(child).copied().unwrap_or(0.0))
                    .filter(|score| !score.is_nan())
                    .sum();
                let own = scores.get(&cluster).copied().unwrap_or(f64::NAN);
                if subtree > own {
                    selected.remove(&cluster);
                    scores.insert(cluster, subtree);
                } else {
                    for descendant in descendants_of(&children, cluster) {
                        selected.remove(&descendant);
                    }
                }
            }
            selected
        }
        ClusterSelection::Leaf => {
            let leaves: BTreeSet<usize> = candidates
                .iter()
                .copied()
                .filter(|&cluster| cluster != root && !children.contains_key(&cluster))
                .collect();
            if leaves.is_empty() && allow_single_cluster {
                BTreeSet::from([root])
            } else {
                leaves
            }
        }
    }
}

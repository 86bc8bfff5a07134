//! Excess-of-mass stability scores.

use std::collections::BTreeMap;

use super::CondensedTree;

/// Scores every cluster of `condensed` by the lambda mass it holds after
/// birth.
///
/// Keys are the root and every cluster of at least two points. A cluster
/// born at an infinite lambda scores `NaN`, as does a root that never
/// splits into clusters.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use bunrui_core::{MstEdge, compute_stability, condense_tree, label_linkage};
///
/// let linkage = label_linkage(&[MstEdge::new(0, 1, 0.5), MstEdge::new(1, 2, 2.0)])?;
/// let condensed = condense_tree(&linkage, NonZeroUsize::new(2).expect("non-zero"));
/// let stability = compute_stability(&condensed);
/// assert!(stability[&3].is_nan());
/// # Ok::<(), bunrui_core::HierarchyError>(())
/// ```
#[must_use]
pub fn compute_stability(condensed: &CondensedTree) -> BTreeMap<usize, f64> {
    let root = condensed.root();
    let mut births = BTreeMap::from([(root, 0.0)]);
    for row in condensed.rows().iter().filter(|row| row.child >= root) {
        births.insert(row.child, row.lambda);
    }

    let mut stability: BTreeMap<usize, f64> = BTreeMap::from([(root, 0.0)]);
    for row in condensed.cluster_rows() {
        stability.insert(row.child, 0.0);
    }
    for row in condensed.rows() {
        let birth = births.get(&row.parent).copied().unwrap_or(0.0);
        if let Some(score) = stability.get_mut(&row.parent) {
            *score += (row.lambda - birth) * row.child_size as f64;
        }
    }

    for (cluster, score) in &mut stability {
        if births.get(cluster).is_some_and(|birth| birth.is_infinite()) {
            *score = f64::NAN;
        }
    }

    let splits = condensed.cluster_rows().any(|row| row.parent == root);
    if !splits && let Some(score) = stability.get_mut(&root) {
        *score = f64::NAN;
    }
    stability
}

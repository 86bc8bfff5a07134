//! Serialisable capture of a fitted model's outputs.

use std::collections::BTreeMap;

use crate::hierarchy::{CondensedRow, CondensedTree};

/// Labels and the state needed to inspect them without refitting.
///
/// Byte encoding is left to the caller; with the `serde` feature the
/// snapshot serialises through any serde format.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelSnapshot {
    /// Label per point, `-1` for noise.
    pub labels: Vec<i64>,
    /// Core distance per point.
    pub core_distances: Vec<f64>,
    /// Membership strength per point.
    pub probabilities: Vec<f64>,
    /// Rows of the condensed tree.
    pub condensed: Vec<CondensedRow>,
    /// Stability per condensed cluster.
    pub stability: BTreeMap<usize, f64>,
}

impl ModelSnapshot {
    /// Number of points the model was fitted on.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.labels.len()
    }

    /// Number of distinct clusters.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.labels
            .iter()
            .copied()
            .max()
            .and_then(|label| usize::try_from(label + 1).ok())
            .unwrap_or(0)
    }

    /// Rebuilds the condensed tree.
    #[must_use]
    pub fn condensed_tree(&self) -> CondensedTree {
        CondensedTree::from_rows(self.condensed.clone(), self.n_points())
    }
}

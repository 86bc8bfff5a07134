//! Point labels, membership strengths and GLOSH outlier scores.

use std::collections::{BTreeMap, BTreeSet};

use super::CondensedTree;
use crate::union_find::TreeUnionFind;

/// Flat labels together with the condensed cluster behind each label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Labelling {
    labels: Vec<i64>,
    clusters: Vec<usize>,
}

impl Labelling {
    /// Labels every point as noise.
    #[must_use]
    pub fn noise(n_points: usize) -> Self {
        Self {
            labels: vec![-1; n_points],
            clusters: Vec::new(),
        }
    }

    /// Label per point, `-1` for noise.
    #[must_use]
    #[rustfmt::skip]
    pub fn labels(&self) -> &[i64] { &self.labels }

    /// Condensed cluster id of each dense label.
    #[must_use]
    #[rustfmt::skip]
    pub fn clusters(&self) -> &[usize] { &self.clusters }

    /// Number of distinct labels.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Number of points labelled as noise.
    #[must_use]
    pub fn n_noise(&self) -> usize {
        self.labels.iter().filter(|&&label| label < 0).count()
    }

    /// Condensed cluster a point was assigned to.
    #[must_use]
    pub fn cluster_of(&self, point: usize) -> Option<usize> {
        let label = usize::try_from(*self.labels.get(point)?).ok()?;
        self.clusters.get(label).copied()
    }

    /// Consumes the labelling and returns the label vector.
    #[must_use]
    pub fn into_labels(self) -> Vec<i64> {
        self.labels
    }
}

fn point_lambdas(condensed: &CondensedTree) -> Vec<Option<f64>> {
    let mut lambdas = vec![None; condensed.n_points()];
    for row in condensed.rows() {
        if let Some(slot) = lambdas.get_mut(row.child) {
            *slot = Some(row.lambda);
        }
    }
    lambdas
}

/// Largest lambda among each cluster's direct rows, indexed by cluster id.
fn death_lambdas(condensed: &CondensedTree) -> Vec<f64> {
    let mut deaths = vec![0.0_f64; condensed.max_id() + 1];
    for row in condensed.rows() {
        deaths[row.parent] = deaths[row.parent].max(row.lambda);
    }
    deaths
}

/// Resolves every point to its nearest selected ancestor.
///
/// Points whose walk reaches the root are noise, except that with
/// `allow_single_cluster` and the root as the only selected cluster, points
/// that stay until the root's last split keep the root's label. Labels are
/// dense, assigned in ascending cluster-id order over clusters that receive
/// at least one point.
#[must_use]
pub fn assign_labels(
    condensed: &CondensedTree,
    selected: &BTreeSet<usize>,
    allow_single_cluster: bool,
) -> Labelling {
    let n_points = condensed.n_points();
    let root = condensed.root();
    let mut forest = TreeUnionFind::new(condensed.max_id() + 1);
    for row in condensed.rows() {
        if !selected.contains(&row.child) {
            forest.union(row.parent, row.child);
        }
    }

    let single_root = allow_single_cluster && selected.len() == 1 && selected.contains(&root);
    let root_threshold = death_lambdas(condensed)[root];
    let lambdas = point_lambdas(condensed);

    let resolved: Vec<Option<usize>> = (0..n_points)
        .map(|point| {
            let cluster = forest.find(point);
            if cluster < root {
                None
            } else if cluster == root {
                let keeps_root = single_root
                    && lambdas[point].is_some_and(|lambda| lambda >= root_threshold);
                keeps_root.then_some(root)
            } else {
                selected.contains(&cluster).then_some(cluster)
            }
        })
        .collect();

    let clusters: Vec<usize> = resolved
        .iter()
        .flatten()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let dense: BTreeMap<usize, i64> = clusters
        .iter()
        .zip(0_i64..)
        .map(|(&cluster, label)| (cluster, label))
        .collect();
    let labels = resolved
        .iter()
        .map(|cluster| cluster.and_then(|id| dense.get(&id).copied()).unwrap_or(-1))
        .collect();
    Labelling { labels, clusters }
}

/// Strength with which each point belongs to its cluster, in `[0, 1]`.
///
/// A point's lambda is capped at the lambda where its cluster last sheds
/// points, then divided by it. Noise scores `0`.
#[must_use]
pub fn membership_probabilities(condensed: &CondensedTree, labelling: &Labelling) -> Vec<f64> {
    let deaths = death_lambdas(condensed);
    let lambdas = point_lambdas(condensed);
    (0..condensed.n_points())
        .map(|point| {
            let Some(cluster) = labelling.cluster_of(point) else {
                return 0.0;
            };
            let death = deaths.get(cluster).copied().unwrap_or(0.0);
            let lambda = lambdas[point].unwrap_or(f64::INFINITY);
            if death == 0.0 || !lambda.is_finite() {
                1.0
            } else {
                lambda.min(death) / death
            }
        })
        .collect()
}

/// GLOSH outlier scores in `[0, 1]`, one per point.
///
/// Each cluster's death lambda is the largest lambda anywhere beneath it. A
/// point scores how far its own lambda falls short of its cluster's. Points
/// that never leave a cluster score `0`.
#[must_use]
pub fn outlier_scores(condensed: &CondensedTree) -> Vec<f64> {
    let root = condensed.root();
    let mut deaths = death_lambdas(condensed);
    let mut cluster_rows: Vec<_> = condensed
        .rows()
        .iter()
        .filter(|row| row.child >= root)
        .collect();
    cluster_rows.sort_by(|a, b| b.child.cmp(&a.child));
    for row in cluster_rows {
        deaths[row.parent] = deaths[row.parent].max(deaths[row.child]);
    }

    let mut scores = vec![0.0; condensed.n_points()];
    for row in condensed.rows().iter().filter(|row| row.child < root) {
        let lambda_max = deaths[row.parent];
        scores[row.child] = if lambda_max == 0.0 || !row.lambda.is_finite() {
            0.0
        } else if lambda_max.is_infinite() {
            1.0
        } else {
            (lambda_max - row.lambda) / lambda_max
        };
    }
    scores
}

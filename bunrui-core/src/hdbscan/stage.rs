//! Fit progress and non-fatal fit diagnostics.

use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

use super::Algorithm;
use crate::metric::{DistanceMetric, Metric};

/// Stage a model has reached while fitting.
///
/// Stages only move forward during a fit; [`crate::Hdbscan::refit`] resets
/// them to [`FitStage::Unfit`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum FitStage {
    /// Nothing has been computed.
    #[default]
    Unfit = 0,
    /// Core distances are available.
    CoreDistancesComputed = 1,
    /// The mutual-reachability spanning tree is built.
    MstBuilt = 2,
    /// The single-linkage dendrogram is labelled.
    DendrogramLabeled = 3,
    /// The dendrogram is condensed.
    Condensed = 4,
    /// Cluster stabilities are scored.
    StabilityComputed = 5,
    /// Flat labels are assigned; the model is fitted.
    LabelsExtracted = 6,
}

impl FitStage {
    /// Stable, lower-case name of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unfit => "unfit",
            Self::CoreDistancesComputed => "core_distances_computed",
            Self::MstBuilt => "mst_built",
            Self::DendrogramLabeled => "dendrogram_labeled",
            Self::Condensed => "condensed",
            Self::StabilityComputed => "stability_computed",
            Self::LabelsExtracted => "labels_extracted",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::CoreDistancesComputed,
            2 => Self::MstBuilt,
            3 => Self::DendrogramLabeled,
            4 => Self::Condensed,
            5 => Self::StabilityComputed,
            6 => Self::LabelsExtracted,
            _ => Self::Unfit,
        }
    }
}

impl fmt::Display for FitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free cell holding the current [`FitStage`].
#[derive(Debug, Default)]
pub(super) struct StageCell(AtomicU8);

impl StageCell {
    pub(super) fn load(&self) -> FitStage {
        FitStage::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(super) fn store(&self, stage: FitStage) {
        self.0.store(stage as u8, Ordering::Release);
    }
}

/// Non-fatal adjustment made while fitting.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum FitWarning {
    /// The configured metric is not usable with the tree behind `algorithm`,
    /// so Euclidean distance was used instead.
    MetricFallback {
        /// Metric the model was configured with.
        requested: Metric,
        /// Algorithm that rejected it.
        algorithm: Algorithm,
    },
}

impl fmt::Display for FitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MetricFallback {
                requested,
                algorithm,
            } => write!(
                f,
                "metric {} is not supported by {algorithm}; falling back to euclidean",
                requested.name()
            ),
        }
    }
}

//! Distance metrics.
//!
//! Every metric exposes a full distance and a cheaper "reduced" form that is
//! monotonic in the full distance (for example squared Euclidean). Trees
//! prune and rank candidates in reduced space and convert back only when
//! reporting results.

use std::f64::consts::FRAC_PI_2;

use crate::error::MetricError;

/// Pluggable distance capability.
///
/// Implementations must satisfy
/// `partial_to_distance(partial_distance(a, b)) == distance(a, b)` (within
/// floating-point tolerance) and keep `partial_distance` monotonic in
/// `distance`.
pub trait DistanceMetric: Send + Sync {
    /// Full distance between `a` and `b`.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Reduced distance between `a` and `b`.
    fn partial_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        self.distance_to_partial(self.distance(a, b))
    }

    /// Converts a reduced distance to a full distance.
    fn partial_to_distance(&self, partial: f64) -> f64;

    /// Converts a full distance to a reduced distance.
    fn distance_to_partial(&self, distance: f64) -> f64;

    /// Stable, lower-case identifier.
    fn name(&self) -> &'static str;

    /// Whether the metric satisfies the triangle inequality.
    ///
    /// Tree-based search requires a true metric.
    fn is_true_metric(&self) -> bool {
        true
    }
}

/// Built-in metrics.
///
/// # Examples
/// ```
/// use bunrui_core::{DistanceMetric, Metric};
///
/// let metric = Metric::Euclidean;
/// let a = [0.0, 0.0];
/// let b = [3.0, 4.0];
/// assert_eq!(metric.distance(&a, &b), 5.0);
/// assert_eq!(metric.partial_distance(&a, &b), 25.0);
/// assert_eq!(metric.partial_to_distance(25.0), 5.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum Metric {
    /// L2 distance; reduced form is the squared distance.
    #[default]
    Euclidean,
    /// L1 distance.
    Manhattan,
    /// L-infinity distance.
    Chebyshev,
    /// Lp distance for `p >= 1`; reduced form is the sum of `|d|^p`.
    Minkowski {
        /// The power `p`.
        p: f64,
    },
    /// Great-circle distance on the unit sphere over `[latitude, longitude]`
    /// in radians.
    Haversine,
    /// One minus cosine similarity. Not a true metric.
    Cosine,
}

impl Metric {
    /// Builds a validated Minkowski metric.
    ///
    /// # Errors
    /// Returns [`MetricError::InvalidMinkowskiPower`] when `p` is not finite
    /// or smaller than one.
    pub fn minkowski(p: f64) -> Result<Self, MetricError> {
        if !p.is_finite() || p < 1.0 {
            return Err(MetricError::InvalidMinkowskiPower { p });
        }
        Ok(Self::Minkowski { p })
    }

    /// Re-validates parameters of a metric built with a literal.
    ///
    /// # Errors
    /// Returns [`MetricError::InvalidMinkowskiPower`] for an invalid power.
    pub fn validate(self) -> Result<Self, MetricError> {
        match self {
            Self::Minkowski { p } => Self::minkowski(p),
            other => Ok(other),
        }
    }

    /// Whether a KD-tree can use this metric.
    ///
    /// KD bounds are axis-aligned, so only coordinate-wise metrics qualify.
    #[must_use]
    pub const fn supports_kd_tree(&self) -> bool {
        matches!(
            self,
            Self::Euclidean | Self::Manhattan | Self::Chebyshev | Self::Minkowski { .. }
        )
    }

    /// Whether a Ball-tree can use this metric.
    #[must_use]
    pub const fn supports_ball_tree(&self) -> bool {
        self.supports_kd_tree() || matches!(self, Self::Haversine)
    }

    /// Fixed dimensionality required by the metric, if any.
    #[must_use]
    pub const fn required_dimension(&self) -> Option<usize> {
        match self {
            Self::Haversine => Some(2),
            _ => None,
        }
    }

    /// Checks that `cols` features are acceptable for this metric.
    ///
    /// # Errors
    /// Returns [`MetricError::DimensionMismatch`] when the metric needs a
    /// specific number of features.
    pub fn check_dimension(&self, cols: usize) -> Result<(), MetricError> {
        match self.required_dimension() {
            Some(expected) if expected != cols => Err(MetricError::DimensionMismatch {
                metric: self.name(),
                expected,
                actual: cols,
            }),
            _ => Ok(()),
        }
    }

    /// Reduces per-axis gaps into a reduced distance.
    ///
    /// Only meaningful for metrics where [`Self::supports_kd_tree`] holds.
    pub(crate) fn reduce_gaps(&self, gaps: impl Iterator<Item = f64>) -> f64 {
        match *self {
            Self::Euclidean => gaps.map(|gap| gap * gap).sum(),
            Self::Manhattan => gaps.sum(),
            Self::Chebyshev => gaps.fold(0.0, f64::max),
            Self::Minkowski { p } => gaps.map(|gap| gap.powf(p)).sum(),
            Self::Haversine | Self::Cosine => f64::NAN,
        }
    }
}

impl DistanceMetric for Metric {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Haversine => 2.0 * haversine_partial(a, b).sqrt().asin(),
            Self::Cosine => cosine_distance(a, b),
            _ => self.partial_to_distance(self.partial_distance(a, b)),
        }
    }

    fn partial_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Haversine => haversine_partial(a, b),
            Self::Cosine => cosine_distance(a, b),
            _ => self.reduce_gaps(a.iter().zip(b).map(|(x, y)| (x - y).abs())),
        }
    }

    fn partial_to_distance(&self, partial: f64) -> f64 {
        match *self {
            Self::Euclidean => partial.sqrt(),
            Self::Minkowski { p } => partial.powf(p.recip()),
            Self::Haversine => 2.0 * partial.sqrt().asin(),
            Self::Manhattan | Self::Chebyshev | Self::Cosine => partial,
        }
    }

    fn distance_to_partial(&self, distance: f64) -> f64 {
        match *self {
            Self::Euclidean => distance * distance,
            Self::Minkowski { p } => distance.powf(p),
            Self::Haversine => {
                let half = (0.5 * distance).min(FRAC_PI_2).sin();
                half * half
            }
            Self::Manhattan | Self::Chebyshev | Self::Cosine => distance,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Chebyshev => "chebyshev",
            Self::Minkowski { .. } => "minkowski",
            Self::Haversine => "haversine",
            Self::Cosine => "cosine",
        }
    }

    fn is_true_metric(&self) -> bool {
        !matches!(self, Self::Cosine)
    }
}

fn haversine_partial(a: &[f64], b: &[f64]) -> f64 {
    let (Some(&lat_a), Some(&lon_a), Some(&lat_b), Some(&lon_b)) =
        (a.first(), a.get(1), b.first(), b.get(1))
    else {
        return f64::NAN;
    };
    let sin_lat = (0.5 * (lat_a - lat_b)).sin();
    let sin_lon = (0.5 * (lon_a - lon_b)).sin();
    (sin_lat * sin_lat + lat_a.cos() * lat_b.cos() * sin_lon * sin_lon).clamp(0.0, 1.0)
}

fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).max(0.0)
}

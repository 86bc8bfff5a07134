//! Model configuration and the builder that validates it.

use std::{fmt, num::NonZeroUsize};

use super::{FitWarning, Hdbscan};
use crate::{
    Result,
    error::HdbscanError,
    hierarchy::ClusterSelection,
    metric::Metric,
    parallel::ExecutionContext,
};

/// Datasets up to this size always use the dense path under
/// [`Algorithm::Auto`].
const GENERIC_MAX_SAMPLES: usize = 64;

/// Above this many features [`Algorithm::Auto`] prefers Prim over Boruvka.
const BORUVKA_MAX_FEATURES: usize = 60;

/// Strategy used to build the mutual-reachability spanning tree.
///
/// # Examples
/// ```
/// use bunrui_core::{Algorithm, Metric};
///
/// let (resolved, metric, warning) = Algorithm::Auto.resolve(Metric::Haversine, 500, 2);
/// assert_eq!(resolved, Algorithm::BoruvkaBallTree);
/// assert_eq!(metric, Metric::Haversine);
/// assert!(warning.is_none());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum Algorithm {
    /// Pick from the data shape and metric.
    #[default]
    Auto,
    /// Dense pairwise distances with Prim's algorithm.
    Generic,
    /// Prim's algorithm over a KD-tree.
    PrimKdTree,
    /// Prim's algorithm over a Ball-tree.
    PrimBallTree,
    /// Boruvka rounds over a KD-tree.
    BoruvkaKdTree,
    /// Boruvka rounds over a Ball-tree.
    BoruvkaBallTree,
}

impl Algorithm {
    /// Stable, lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Generic => "generic",
            Self::PrimKdTree => "prim_kd_tree",
            Self::PrimBallTree => "prim_ball_tree",
            Self::BoruvkaKdTree => "boruvka_kd_tree",
            Self::BoruvkaBallTree => "boruvka_ball_tree",
        }
    }

    const fn uses_kd_tree(self) -> bool {
        matches!(self, Self::PrimKdTree | Self::BoruvkaKdTree)
    }

    const fn uses_ball_tree(self) -> bool {
        matches!(self, Self::PrimBallTree | Self::BoruvkaBallTree)
    }

    /// Chooses the concrete algorithm and metric for `rows` samples with
    /// `cols` features.
    ///
    /// `Auto` uses the dense path for metrics no tree supports and for small
    /// datasets, Prim for wide data and Boruvka otherwise, on a KD-tree
    /// whenever the metric allows one. An explicit tree algorithm whose tree
    /// rejects `metric` keeps the algorithm, switches to Euclidean and
    /// reports a [`FitWarning::MetricFallback`].
    #[must_use]
    pub fn resolve(self, metric: Metric, rows: usize, cols: usize) -> (Self, Metric, Option<FitWarning>) {
        match self {
            Self::Auto => {
                let resolved = if !metric.supports_ball_tree() || rows <= GENERIC_MAX_SAMPLES {
                    Self::Generic
                } else {
                    match (cols > BORUVKA_MAX_FEATURES, metric.supports_kd_tree()) {
                        (true, true) => Self::PrimKdTree,
                        (true, false) => Self::PrimBallTree,
                        (false, true) => Self::BoruvkaKdTree,
                        (false, false) => Self::BoruvkaBallTree,
                    }
                };
                (resolved, metric, None)
            }
            tree if (tree.uses_kd_tree() && !metric.supports_kd_tree())
                || (tree.uses_ball_tree() && !metric.supports_ball_tree()) =>
            {
                let warning = FitWarning::MetricFallback {
                    requested: metric,
                    algorithm: tree,
                };
                (tree, Metric::Euclidean, Some(warning))
            }
            other => (other, metric, None),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated model parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HdbscanConfig {
    pub(super) min_cluster_size: NonZeroUsize,
    pub(super) min_samples: NonZeroUsize,
    pub(super) alpha: f64,
    pub(super) leaf_size: NonZeroUsize,
    pub(super) metric: Metric,
    pub(super) algorithm: Algorithm,
    pub(super) cluster_selection: ClusterSelection,
    pub(super) allow_single_cluster: bool,
    pub(super) context: ExecutionContext,
}

impl HdbscanConfig {
    /// Smallest group of points reported as a cluster.
    #[must_use]
    #[rustfmt::skip]
    pub fn min_cluster_size(&self) -> NonZeroUsize { self.min_cluster_size }

    /// Neighbour count used for core distances.
    #[must_use]
    #[rustfmt::skip]
    pub fn min_samples(&self) -> NonZeroUsize { self.min_samples }

    /// Distance scaling applied before mutual reachability.
    #[must_use]
    #[rustfmt::skip]
    pub fn alpha(&self) -> f64 { self.alpha }

    /// Leaf size of the spatial tree.
    #[must_use]
    #[rustfmt::skip]
    pub fn leaf_size(&self) -> NonZeroUsize { self.leaf_size }

    /// Configured metric, before any fallback.
    #[must_use]
    #[rustfmt::skip]
    pub fn metric(&self) -> Metric { self.metric }

    /// Configured algorithm, before resolution.
    #[must_use]
    #[rustfmt::skip]
    pub fn algorithm(&self) -> Algorithm { self.algorithm }

    /// Flat cluster selection strategy.
    #[must_use]
    #[rustfmt::skip]
    pub fn cluster_selection(&self) -> ClusterSelection { self.cluster_selection }

    /// Whether the root may be reported as a cluster.
    #[must_use]
    #[rustfmt::skip]
    pub fn allow_single_cluster(&self) -> bool { self.allow_single_cluster }

    /// Scheduling for the row-parallel passes.
    #[must_use]
    #[rustfmt::skip]
    pub fn execution_context(&self) -> ExecutionContext { self.context }
}

/// Configures and constructs [`Hdbscan`] models.
///
/// # Examples
/// ```
/// use bunrui_core::{Algorithm, HdbscanBuilder};
///
/// let model = HdbscanBuilder::new()
///     .with_min_cluster_size(8)
///     .with_algorithm(Algorithm::PrimBallTree)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(model.config().min_cluster_size().get(), 8);
/// assert_eq!(model.config().min_samples().get(), 8);
/// ```
#[derive(Clone, Debug)]
pub struct HdbscanBuilder {
    min_cluster_size: usize,
    min_samples: Option<usize>,
    alpha: f64,
    leaf_size: usize,
    metric: Metric,
    algorithm: Algorithm,
    cluster_selection: ClusterSelection,
    allow_single_cluster: bool,
    context: ExecutionContext,
}

impl Default for HdbscanBuilder {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            min_samples: None,
            alpha: 1.0,
            leaf_size: 40,
            metric: Metric::Euclidean,
            algorithm: Algorithm::Auto,
            cluster_selection: ClusterSelection::ExcessOfMass,
            allow_single_cluster: false,
            context: ExecutionContext::default(),
        }
    }
}

impl HdbscanBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use bunrui_core::HdbscanBuilder;
    ///
    /// let builder = HdbscanBuilder::new();
    /// assert_eq!(builder.min_cluster_size(), 5);
    /// assert_eq!(builder.min_samples(), None);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the minimum cluster size.
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Returns the configured minimum cluster size.
    #[must_use]
    #[rustfmt::skip]
    pub fn min_cluster_size(&self) -> usize { self.min_cluster_size }

    /// Overrides the neighbour count used for core distances. Defaults to
    /// the minimum cluster size.
    #[must_use]
    pub fn with_min_samples(mut self, samples: usize) -> Self {
        self.min_samples = Some(samples);
        self
    }

    /// Returns the explicitly configured `min_samples`, if any.
    #[must_use]
    #[rustfmt::skip]
    pub fn min_samples(&self) -> Option<usize> { self.min_samples }

    /// Scales raw distances by `1 / alpha` before mutual reachability.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the spatial tree leaf size.
    #[must_use]
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    /// Sets the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Sets the spanning tree strategy.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets how flat clusters are chosen.
    #[must_use]
    pub fn with_cluster_selection(mut self, selection: ClusterSelection) -> Self {
        self.cluster_selection = selection;
        self
    }

    /// Lets the whole dataset be reported as one cluster.
    #[must_use]
    pub fn with_allow_single_cluster(mut self, allow: bool) -> Self {
        self.allow_single_cluster = allow;
        self
    }

    /// Sets scheduling for the row-parallel passes.
    #[must_use]
    pub fn with_execution_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Validates the configuration and constructs an unfitted [`Hdbscan`].
    ///
    /// # Errors
    /// Returns [`HdbscanError::InvalidMinClusterSize`],
    /// [`HdbscanError::InvalidMinSamples`] or [`HdbscanError::InvalidLeafSize`]
    /// for zero sizes, [`HdbscanError::InvalidAlpha`] unless alpha is finite
    /// and positive, and [`HdbscanError::Metric`] for an invalid metric.
    ///
    /// # Examples
    /// ```
    /// use bunrui_core::HdbscanBuilder;
    ///
    /// let error = HdbscanBuilder::new().with_alpha(0.0).build().expect_err("alpha must be positive");
    /// assert_eq!(error.code().as_str(), "HDBSCAN_INVALID_ALPHA");
    /// ```
    pub fn build(self) -> Result<Hdbscan> {
        let min_cluster_size = NonZeroUsize::new(self.min_cluster_size).ok_or(
            HdbscanError::InvalidMinClusterSize {
                got: self.min_cluster_size,
            },
        )?;
        let min_samples = match self.min_samples {
            None => min_cluster_size,
            Some(got) => NonZeroUsize::new(got).ok_or(HdbscanError::InvalidMinSamples { got })?,
        };
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(HdbscanError::InvalidAlpha { got: self.alpha });
        }
        let leaf_size = NonZeroUsize::new(self.leaf_size).ok_or(HdbscanError::InvalidLeafSize {
            got: self.leaf_size,
        })?;
        let metric = self.metric.validate()?;

        Ok(Hdbscan::new(HdbscanConfig {
            min_cluster_size,
            min_samples,
            alpha: self.alpha,
            leaf_size,
            metric,
            algorithm: self.algorithm,
            cluster_selection: self.cluster_selection,
            allow_single_cluster: self.allow_single_cluster,
            context: self.context,
        }))
    }
}

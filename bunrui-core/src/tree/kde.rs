//! Kernel density estimation over a tree.
//!
//! Densities are accumulated in log space. Every node carries a lower bound
//! (all samples at the node's maximum distance) and a bound spread (the gap
//! up to all samples at its minimum distance). A node whose spread is within
//! tolerance contributes the midpoint of its bounds; anything else is split,
//! down to exact evaluation at the leaves. With `atol = rtol = 0` the result
//! is exact up to rounding.

use std::f64::consts::{LN_2, PI};

use tracing::instrument;

use super::{
    BinaryTree, NodeBounds, TreeError, children,
    heap::{NodeHeap, NodeHeapEntry},
};
use crate::{matrix::SampleMatrix, metric::DistanceMetric};

/// Smoothing kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum Kernel {
    /// `exp(-d² / 2h²)`.
    #[default]
    Gaussian,
    /// `1` inside the bandwidth.
    Tophat,
    /// `1 - d² / h²` inside the bandwidth.
    Epanechnikov,
    /// `exp(-d / h)`.
    Exponential,
    /// `1 - d / h` inside the bandwidth.
    Linear,
    /// `cos(πd / 2h)` inside the bandwidth.
    Cosine,
}

impl Kernel {
    /// Unnormalised log kernel at `distance` for bandwidth `bandwidth`.
    #[must_use]
    pub fn log_kernel(self, distance: f64, bandwidth: f64) -> f64 {
        let scaled = distance / bandwidth;
        let inside = distance < bandwidth;
        match self {
            Self::Gaussian => -0.5 * scaled * scaled,
            Self::Exponential => -scaled,
            Self::Tophat if inside => 0.0,
            Self::Epanechnikov if inside => (1.0 - scaled * scaled).ln(),
            Self::Linear if inside => (1.0 - scaled).ln(),
            Self::Cosine if inside => (0.5 * PI * scaled).cos().ln(),
            Self::Tophat | Self::Epanechnikov | Self::Linear | Self::Cosine => f64::NEG_INFINITY,
        }
    }

    /// Log of the constant that normalises the kernel to unit mass in
    /// `dimension` dimensions.
    #[must_use]
    pub fn log_norm(self, bandwidth: f64, dimension: usize) -> f64 {
        let d = dimension as f64;
        let n = dimension as isize;
        let factor = match self {
            Self::Gaussian => 0.5 * d * (2.0 * PI).ln(),
            Self::Tophat => log_ball_volume(n),
            Self::Epanechnikov => log_ball_volume(n) + (2.0 / (d + 2.0)).ln(),
            Self::Exponential => log_sphere_area(n - 1) + ln_gamma_half(2 * dimension),
            Self::Linear => log_ball_volume(n) - (d + 1.0).ln(),
            Self::Cosine => {
                let two_over_pi = 2.0 / PI;
                let mut sum = 0.0;
                let mut term = two_over_pi;
                for k in (1..=dimension).step_by(2) {
                    sum += term;
                    let remaining = (dimension - k) as f64;
                    term *= -remaining * (remaining - 1.0) * two_over_pi * two_over_pi;
                }
                sum.ln() + log_sphere_area(n - 1)
            }
        };
        -factor - d * bandwidth.ln()
    }
}

/// `ln Γ(twice / 2)` for a positive half-integer or integer argument.
fn ln_gamma_half(twice: usize) -> f64 {
    let (mut value, mut x) = if twice % 2 == 1 {
        (0.5 * PI.ln(), 0.5)
    } else {
        (0.0, 1.0)
    };
    let target = twice as f64 / 2.0;
    while x < target {
        value += x.ln();
        x += 1.0;
    }
    value
}

/// Log volume of the unit `n`-ball (`n >= -1`).
fn log_ball_volume(n: isize) -> f64 {
    let twice = usize::try_from(n + 2).unwrap_or(1);
    0.5 * n as f64 * PI.ln() - ln_gamma_half(twice)
}

/// Log surface area of the unit `n`-sphere (`n >= 0`).
fn log_sphere_area(n: isize) -> f64 {
    (2.0 * PI).ln() + log_ball_volume(n - 1)
}

pub(crate) fn log_add_exp(x: f64, y: f64) -> f64 {
    let high = x.max(y);
    if high == f64::NEG_INFINITY {
        return high;
    }
    high + ((x - high).exp() + (y - high).exp()).ln()
}

pub(crate) fn log_sub_exp(x: f64, y: f64) -> f64 {
    if x <= y {
        f64::NEG_INFINITY
    } else {
        x + (-(y - x).exp()).ln_1p()
    }
}

/// Tolerances and traversal order for [`BinaryTree::kernel_density`].
///
/// # Examples
/// ```
/// use bunrui_core::KdeOptions;
///
/// let options = KdeOptions::default().with_rtol(1e-4).with_log(true);
/// assert_eq!(options.atol(), 0.0);
/// assert!(options.log());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KdeOptions {
    atol: f64,
    rtol: f64,
    breadth_first: bool,
    log: bool,
}

impl Default for KdeOptions {
    fn default() -> Self {
        Self {
            atol: 0.0,
            rtol: 1e-8,
            breadth_first: false,
            log: false,
        }
    }
}

impl KdeOptions {
    /// Absolute tolerance on each density sum.
    #[must_use]
    pub const fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// Relative tolerance on each density sum.
    #[must_use]
    pub const fn with_rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    /// Refines the node with the widest bound spread first.
    #[must_use]
    pub const fn with_breadth_first(mut self, breadth_first: bool) -> Self {
        self.breadth_first = breadth_first;
        self
    }

    /// Returns log densities instead of densities.
    #[must_use]
    pub const fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Absolute tolerance.
    #[must_use]
    #[rustfmt::skip]
    pub const fn atol(&self) -> f64 { self.atol }

    /// Relative tolerance.
    #[must_use]
    #[rustfmt::skip]
    pub const fn rtol(&self) -> f64 { self.rtol }

    /// Whether breadth-first refinement is enabled.
    #[must_use]
    #[rustfmt::skip]
    pub const fn breadth_first(&self) -> bool { self.breadth_first }

    /// Whether log densities are returned.
    #[must_use]
    #[rustfmt::skip]
    pub const fn log(&self) -> bool { self.log }

    pub(crate) fn validate(&self, bandwidth: f64) -> Result<(), TreeError> {
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(TreeError::InvalidBandwidth { bandwidth });
        }
        let valid = |tolerance: f64| tolerance.is_finite() && tolerance >= 0.0;
        if !valid(self.atol) || !valid(self.rtol) {
            return Err(TreeError::InvalidTolerance {
                atol: self.atol,
                rtol: self.rtol,
            });
        }
        Ok(())
    }
}

/// Running log-space bounds for one query point.
#[derive(Clone, Copy, Debug)]
struct DensityBounds {
    min: f64,
    spread: f64,
}

impl DensityBounds {
    fn replace(&mut self, old: Self, new: &[Self]) {
        self.min = log_sub_exp(self.min, old.min);
        self.spread = log_sub_exp(self.spread, old.spread);
        for part in new {
            self.min = log_add_exp(self.min, part.min);
            self.spread = log_add_exp(self.spread, part.spread);
        }
    }

    fn estimate(self) -> f64 {
        log_add_exp(self.min, self.spread - LN_2)
    }
}

/// Fixed parameters of one density evaluation.
struct KdeParams {
    kernel: Kernel,
    bandwidth: f64,
    log_norm: f64,
    log_atol: f64,
    log_rtol: f64,
    log_total: f64,
}

impl KdeParams {
    /// Whether a node's bounds are already tight enough.
    fn resolved(&self, node: DensityBounds, log_count: f64) -> bool {
        self.log_norm + node.spread - log_count + self.log_total
            <= log_add_exp(self.log_atol, self.log_rtol + self.log_norm + node.min)
    }

    /// Whether the whole estimate is tight enough.
    fn converged(&self, global: DensityBounds) -> bool {
        self.log_norm + global.spread
            <= log_add_exp(self.log_atol, self.log_rtol + self.log_norm + global.min)
    }
}

impl<B: NodeBounds> BinaryTree<B> {
    /// Sums normalised kernels centred on every sample, evaluated at each
    /// query row.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`],
    /// [`TreeError::InvalidBandwidth`] or [`TreeError::InvalidTolerance`].
    #[instrument(
        name = "tree.kernel_density",
        err,
        skip(self, points, options),
        fields(tree = B::NAME, queries = points.rows(), breadth_first = options.breadth_first()),
    )]
    pub fn kernel_density(
        &self,
        points: &SampleMatrix,
        bandwidth: f64,
        kernel: Kernel,
        options: KdeOptions,
    ) -> Result<Vec<f64>, TreeError> {
        self.check_points(points)?;
        options.validate(bandwidth)?;
        let params = KdeParams {
            kernel,
            bandwidth,
            log_norm: kernel.log_norm(bandwidth, self.n_features()),
            log_atol: options.atol().ln(),
            log_rtol: options.rtol().ln(),
            log_total: (self.n_samples() as f64).ln(),
        };
        let densities = self.context.map_rows(points.rows(), |row| {
            let point = points.row(row);
            let root = self.node_density_bounds(0, point, &params);
            let log_sum = if options.breadth_first() {
                self.density_breadth_first(point, &params, root)
            } else {
                let mut global = root;
                self.density_depth_first(0, point, &params, root, &mut global);
                global.estimate()
            };
            let log_density = log_sum + params.log_norm;
            if options.log() {
                log_density
            } else {
                log_density.exp()
            }
        });
        Ok(densities)
    }

    fn node_density_bounds(&self, node: usize, point: &[f64], params: &KdeParams) -> DensityBounds {
        let log_count = (self.node_data[node].len() as f64).ln();
        let min = log_count
            + params
                .kernel
                .log_kernel(self.max_dist(node, point), params.bandwidth);
        let max = log_count
            + params
                .kernel
                .log_kernel(self.min_dist(node, point), params.bandwidth);
        DensityBounds {
            min,
            spread: log_sub_exp(max, min),
        }
    }

    fn exact_leaf_density(&self, node: usize, point: &[f64], params: &KdeParams) -> f64 {
        self.node_indices(node).iter().fold(f64::NEG_INFINITY, |sum, &index| {
            let distance = self.metric.distance(point, self.data.row(index));
            log_add_exp(sum, params.kernel.log_kernel(distance, params.bandwidth))
        })
    }

    fn density_depth_first(
        &self,
        node: usize,
        point: &[f64],
        params: &KdeParams,
        local: DensityBounds,
        global: &mut DensityBounds,
    ) {
        let info = self.node_data[node];
        if params.resolved(local, (info.len() as f64).ln()) {
            return;
        }
        if info.is_leaf {
            global.replace(local, &[]);
            global.min = log_add_exp(global.min, self.exact_leaf_density(node, point, params));
            return;
        }
        let (left, right) = children(node);
        let left_bounds = self.node_density_bounds(left, point, params);
        let right_bounds = self.node_density_bounds(right, point, params);
        global.replace(local, &[left_bounds, right_bounds]);
        self.density_depth_first(left, point, params, left_bounds, global);
        self.density_depth_first(right, point, params, right_bounds, global);
    }

    fn density_breadth_first(&self, point: &[f64], params: &KdeParams, root: DensityBounds) -> f64 {
        let mut node_bounds = vec![root; self.n_nodes()];
        let mut global = root;
        let mut queue = NodeHeap::default();
        queue.push(NodeHeapEntry {
            val: -root.spread,
            i1: 0,
            i2: 0,
        });
        while let Some(entry) = queue.pop() {
            if params.converged(global) {
                break;
            }
            let node = entry.i1;
            let info = self.node_data[node];
            let local = node_bounds[node];
            if params.resolved(local, (info.len() as f64).ln()) {
                continue;
            }
            if info.is_leaf {
                global.replace(local, &[]);
                global.min = log_add_exp(global.min, self.exact_leaf_density(node, point, params));
                continue;
            }
            let (left, right) = children(node);
            let left_bounds = self.node_density_bounds(left, point, params);
            let right_bounds = self.node_density_bounds(right, point, params);
            global.replace(local, &[left_bounds, right_bounds]);
            for (child, bounds) in [(left, left_bounds), (right, right_bounds)] {
                node_bounds[child] = bounds;
                queue.push(NodeHeapEntry {
                    val: -bounds.spread,
                    i1: child,
                    i2: 0,
                });
            }
        }
        global.estimate()
    }
}

//! Exhaustive search and the algorithm-selecting facade.

use std::fmt;

use super::{
    BallTree, KdTree, SpatialTree, TreeError, check_radius,
    kde::{KdeOptions, Kernel, log_add_exp},
    knn::{KnnOptions, Neighborhood},
};
use crate::{
    matrix::SampleMatrix,
    metric::{DistanceMetric, Metric},
    parallel::ExecutionContext,
};

/// Exhaustive search over every sample.
///
/// Serves as the reference implementation for the trees and as the fallback
/// for metrics no tree supports.
#[derive(Clone, Debug)]
pub struct BruteForce {
    data: SampleMatrix,
    metric: Metric,
    context: ExecutionContext,
}

impl BruteForce {
    /// Wraps `data` for exhaustive search under `metric`.
    ///
    /// # Errors
    /// Returns [`TreeError::Metric`] when the metric is invalid or requires a
    /// different dimensionality.
    pub fn new(data: SampleMatrix, metric: Metric) -> Result<Self, TreeError> {
        let metric = metric.validate()?;
        metric.check_dimension(data.cols())?;
        Ok(Self {
            data,
            metric,
            context: ExecutionContext::default(),
        })
    }

    /// Runs batched queries under `context`.
    #[must_use]
    pub fn with_execution_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Indexed samples.
    #[must_use]
    #[rustfmt::skip]
    pub fn data(&self) -> &SampleMatrix { &self.data }

    fn check_points(&self, points: &SampleMatrix) -> Result<(), TreeError> {
        if points.cols() == self.data.cols() {
            Ok(())
        } else {
            Err(TreeError::DimensionMismatch {
                expected: self.data.cols(),
                actual: points.cols(),
            })
        }
    }

    fn distances_from(&self, point: &[f64]) -> impl Iterator<Item = (usize, f64)> {
        let metric = self.metric;
        self.data
            .iter_rows()
            .enumerate()
            .map(move |(index, row)| (index, metric.distance(point, row)))
    }
}

impl SpatialTree for BruteForce {
    fn n_samples(&self) -> usize {
        self.data.rows()
    }

    fn n_features(&self) -> usize {
        self.data.cols()
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn query(
        &self,
        points: &SampleMatrix,
        k: usize,
        _options: KnnOptions,
    ) -> Result<Neighborhood, TreeError> {
        self.check_points(points)?;
        if k == 0 || k > self.data.rows() {
            return Err(TreeError::InvalidK {
                k,
                available: self.data.rows(),
            });
        }
        let rows = self.context.map_rows(points.rows(), |row| {
            let mut all: Vec<(usize, f64)> = self.distances_from(points.row(row)).collect();
            all.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            all.truncate(k);
            all
        });
        Ok(into_neighborhood(rows))
    }

    fn query_radius(
        &self,
        points: &SampleMatrix,
        radius: f64,
        sort: bool,
    ) -> Result<Neighborhood, TreeError> {
        self.check_points(points)?;
        check_radius(radius)?;
        let rows = self.context.map_rows(points.rows(), |row| {
            let mut hits: Vec<(usize, f64)> = self
                .distances_from(points.row(row))
                .filter(|&(_, distance)| distance <= radius)
                .collect();
            if sort {
                hits.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            }
            hits
        });
        Ok(into_neighborhood(rows))
    }

    fn query_radius_count(
        &self,
        points: &SampleMatrix,
        radius: f64,
    ) -> Result<Vec<usize>, TreeError> {
        self.check_points(points)?;
        check_radius(radius)?;
        Ok(self.context.map_rows(points.rows(), |row| {
            self.distances_from(points.row(row))
                .filter(|&(_, distance)| distance <= radius)
                .count()
        }))
    }

    fn kernel_density(
        &self,
        points: &SampleMatrix,
        bandwidth: f64,
        kernel: Kernel,
        options: KdeOptions,
    ) -> Result<Vec<f64>, TreeError> {
        self.check_points(points)?;
        options.validate(bandwidth)?;
        let log_norm = kernel.log_norm(bandwidth, self.data.cols());
        Ok(self.context.map_rows(points.rows(), |row| {
            let log_sum = self
                .distances_from(points.row(row))
                .fold(f64::NEG_INFINITY, |sum, (_, distance)| {
                    log_add_exp(sum, kernel.log_kernel(distance, bandwidth))
                });
            let log_density = log_sum + log_norm;
            if options.log() {
                log_density
            } else {
                log_density.exp()
            }
        }))
    }

    fn two_point_correlation(
        &self,
        points: &SampleMatrix,
        radii: &[f64],
    ) -> Result<Vec<usize>, TreeError> {
        self.check_points(points)?;
        for &radius in radii {
            check_radius(radius)?;
        }
        let mut counts = vec![0; radii.len()];
        for point in points.iter_rows() {
            for (_, distance) in self.distances_from(point) {
                for (count, &radius) in counts.iter_mut().zip(radii) {
                    if distance <= radius {
                        *count += 1;
                    }
                }
            }
        }
        Ok(counts)
    }
}

fn into_neighborhood(rows: Vec<Vec<(usize, f64)>>) -> Neighborhood {
    let (indices, distances) = rows
        .into_iter()
        .map(|hits| hits.into_iter().unzip::<usize, f64, Vec<_>, Vec<_>>())
        .unzip();
    Neighborhood::new(distances, indices)
}

/// Index selection for [`NearestNeighbors`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NeighborsAlgorithm {
    /// KD-tree when the metric allows it, then Ball-tree, then brute force.
    #[default]
    Auto,
    /// Always a KD-tree.
    KdTree,
    /// Always a Ball-tree.
    BallTree,
    /// Exhaustive search.
    Brute,
}

impl NeighborsAlgorithm {
    /// Concrete algorithm chosen for `metric`.
    #[must_use]
    pub const fn resolve(self, metric: &Metric) -> Self {
        match self {
            Self::Auto if metric.supports_kd_tree() => Self::KdTree,
            Self::Auto if metric.supports_ball_tree() => Self::BallTree,
            Self::Auto => Self::Brute,
            other => other,
        }
    }
}

/// Neighbour search with the index chosen by [`NeighborsAlgorithm`].
///
/// # Examples
/// ```
/// use bunrui_core::{KnnOptions, Metric, NearestNeighbors, NeighborsAlgorithm, SampleMatrix, SpatialTree};
///
/// let data = SampleMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]])?;
/// let index = NearestNeighbors::fit(data.clone(), NeighborsAlgorithm::Auto, Metric::Cosine, 40)?;
/// assert_eq!(index.algorithm(), NeighborsAlgorithm::Brute);
/// let neighbours = index.query(&data, 1, KnnOptions::default())?;
/// assert_eq!(neighbours.indices()[1], vec![1]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct NearestNeighbors {
    index: Box<dyn SpatialTree>,
    algorithm: NeighborsAlgorithm,
}

impl fmt::Debug for NearestNeighbors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NearestNeighbors")
            .field("algorithm", &self.algorithm)
            .field("n_samples", &self.index.n_samples())
            .field("metric", &self.index.metric())
            .finish()
    }
}

impl NearestNeighbors {
    /// Builds the index selected by `algorithm` with the default execution
    /// context.
    ///
    /// # Errors
    /// Propagates tree construction errors, including metrics unsupported by
    /// an explicitly requested tree.
    pub fn fit(
        data: SampleMatrix,
        algorithm: NeighborsAlgorithm,
        metric: Metric,
        leaf_size: usize,
    ) -> Result<Self, TreeError> {
        Self::fit_with_context(data, algorithm, metric, leaf_size, ExecutionContext::default())
    }

    /// Builds the index selected by `algorithm`, running queries under
    /// `context`.
    ///
    /// # Errors
    /// Propagates tree construction errors.
    pub fn fit_with_context(
        data: SampleMatrix,
        algorithm: NeighborsAlgorithm,
        metric: Metric,
        leaf_size: usize,
        context: ExecutionContext,
    ) -> Result<Self, TreeError> {
        let algorithm = algorithm.resolve(&metric);
        let index: Box<dyn SpatialTree> = match algorithm {
            NeighborsAlgorithm::KdTree => {
                Box::new(KdTree::build(data, leaf_size, metric)?.with_execution_context(context))
            }
            NeighborsAlgorithm::BallTree => {
                Box::new(BallTree::build(data, leaf_size, metric)?.with_execution_context(context))
            }
            NeighborsAlgorithm::Auto | NeighborsAlgorithm::Brute => {
                Box::new(BruteForce::new(data, metric)?.with_execution_context(context))
            }
        };
        Ok(Self { index, algorithm })
    }

    /// Algorithm actually in use.
    #[must_use]
    #[rustfmt::skip]
    pub fn algorithm(&self) -> NeighborsAlgorithm { self.algorithm }

    /// The underlying index.
    #[must_use]
    pub fn index(&self) -> &dyn SpatialTree {
        self.index.as_ref()
    }
}

impl SpatialTree for NearestNeighbors {
    fn n_samples(&self) -> usize {
        self.index.n_samples()
    }

    fn n_features(&self) -> usize {
        self.index.n_features()
    }

    fn metric(&self) -> Metric {
        self.index.metric()
    }

    fn query(
        &self,
        points: &SampleMatrix,
        k: usize,
        options: KnnOptions,
    ) -> Result<Neighborhood, TreeError> {
        self.index.query(points, k, options)
    }

    fn query_radius(
        &self,
        points: &SampleMatrix,
        radius: f64,
        sort: bool,
    ) -> Result<Neighborhood, TreeError> {
        self.index.query_radius(points, radius, sort)
    }

    fn query_radius_count(
        &self,
        points: &SampleMatrix,
        radius: f64,
    ) -> Result<Vec<usize>, TreeError> {
        self.index.query_radius_count(points, radius)
    }

    fn kernel_density(
        &self,
        points: &SampleMatrix,
        bandwidth: f64,
        kernel: Kernel,
        options: KdeOptions,
    ) -> Result<Vec<f64>, TreeError> {
        self.index.kernel_density(points, bandwidth, kernel, options)
    }

    fn two_point_correlation(
        &self,
        points: &SampleMatrix,
        radii: &[f64],
    ) -> Result<Vec<usize>, TreeError> {
        self.index.two_point_correlation(points, radii)
    }
}

//! The fitted HDBSCAN model and its fit pipeline.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, RwLock, RwLockWriteGuard},
    time::Instant,
};

use tracing::{debug, info, instrument, warn};

use super::{
    Algorithm, FitStage, FitWarning, HdbscanBuilder, HdbscanConfig, ModelSnapshot,
    stage::StageCell,
};
use crate::{
    Result,
    error::HdbscanError,
    hierarchy::{
        CondensedTree, Labelling, SingleLinkageTree, assign_labels, compute_stability,
        condense_tree, extract_clusters, membership_probabilities, outlier_scores,
    },
    matrix::{DistanceMatrix, SampleMatrix},
    metric::{DistanceMetric, Metric},
    mst::{MinimumSpanningTree, boruvka, generic_prim, tree_core_distances, tree_prim},
    telemetry,
    tree::{BallTree, BinaryTree, KdTree, NodeBounds},
};

/// Everything a successful fit produced.
#[derive(Clone, Debug)]
pub struct FittedModel {
    labelling: Labelling,
    core_distances: Vec<f64>,
    mst: MinimumSpanningTree,
    linkage: SingleLinkageTree,
    condensed: CondensedTree,
    stability: BTreeMap<usize, f64>,
    probabilities: Vec<f64>,
    outlier_scores: Vec<f64>,
    warnings: Vec<FitWarning>,
    algorithm: Algorithm,
    metric: Metric,
}

impl FittedModel {
    /// Labels and the condensed cluster behind each.
    #[must_use]
    #[rustfmt::skip]
    pub fn labelling(&self) -> &Labelling { &self.labelling }

    /// Label per point, `-1` for noise.
    #[must_use]
    pub fn labels(&self) -> &[i64] {
        self.labelling.labels()
    }

    /// Core distance per point.
    #[must_use]
    #[rustfmt::skip]
    pub fn core_distances(&self) -> &[f64] { &self.core_distances }

    /// Mutual-reachability minimum spanning tree.
    #[must_use]
    #[rustfmt::skip]
    pub fn mst(&self) -> &MinimumSpanningTree { &self.mst }

    /// Single-linkage dendrogram.
    #[must_use]
    #[rustfmt::skip]
    pub fn single_linkage_tree(&self) -> &SingleLinkageTree { &self.linkage }

    /// Condensed cluster tree.
    #[must_use]
    #[rustfmt::skip]
    pub fn condensed_tree(&self) -> &CondensedTree { &self.condensed }

    /// Stability per condensed cluster.
    #[must_use]
    #[rustfmt::skip]
    pub fn stability(&self) -> &BTreeMap<usize, f64> { &self.stability }

    /// Membership strength per point.
    #[must_use]
    #[rustfmt::skip]
    pub fn probabilities(&self) -> &[f64] { &self.probabilities }

    /// GLOSH outlier score per point.
    #[must_use]
    #[rustfmt::skip]
    pub fn outlier_scores(&self) -> &[f64] { &self.outlier_scores }

    /// Adjustments made while fitting.
    #[must_use]
    #[rustfmt::skip]
    pub fn warnings(&self) -> &[FitWarning] { &self.warnings }

    /// Algorithm actually used.
    #[must_use]
    #[rustfmt::skip]
    pub fn algorithm(&self) -> Algorithm { self.algorithm }

    /// Metric actually used.
    #[must_use]
    #[rustfmt::skip]
    pub fn metric(&self) -> Metric { self.metric }

    /// Captures the labels and the state behind them.
    #[must_use]
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            labels: self.labels().to_vec(),
            core_distances: self.core_distances.clone(),
            probabilities: self.probabilities.clone(),
            condensed: self.condensed.rows().to_vec(),
            stability: self.stability.clone(),
        }
    }
}

/// HDBSCAN clustering over a dense sample matrix.
///
/// A model is configured once through [`HdbscanBuilder`] and fitted once.
/// Concurrent fits are serialised and a fit after success is a no-op;
/// [`Hdbscan::refit`] discards the fitted state and starts over. Readers get
/// a shared handle to the fitted state and never block a finished model.
///
/// # Examples
/// ```
/// use bunrui_core::{HdbscanBuilder, SampleMatrix};
///
/// let data = SampleMatrix::from_rows(&[
///     vec![0.0, 0.0], vec![0.1, 0.0], vec![0.0, 0.1], vec![0.1, 0.1],
///     vec![5.0, 5.0], vec![5.1, 5.0], vec![5.0, 5.1], vec![5.1, 5.1],
/// ])?;
/// let model = HdbscanBuilder::new().with_min_cluster_size(3).build()?;
/// model.fit(data)?;
/// assert_eq!(model.labels()?, vec![0, 0, 0, 0, 1, 1, 1, 1]);
/// assert_eq!(model.n_clusters()?, 2);
/// # Ok::<(), bunrui_core::HdbscanError>(())
/// ```
#[derive(Debug)]
pub struct Hdbscan {
    config: HdbscanConfig,
    fit_lock: Mutex<()>,
    fitted: RwLock<Option<Arc<FittedModel>>>,
    stage: StageCell,
}

impl Hdbscan {
    pub(super) fn new(config: HdbscanConfig) -> Self {
        Self {
            config,
            fit_lock: Mutex::new(()),
            fitted: RwLock::new(None),
            stage: StageCell::default(),
        }
    }

    /// Starts a builder with default parameters.
    #[must_use]
    pub fn builder() -> HdbscanBuilder {
        HdbscanBuilder::new()
    }

    /// Validated configuration.
    #[must_use]
    #[rustfmt::skip]
    pub fn config(&self) -> &HdbscanConfig { &self.config }

    /// Stage the current or last fit reached.
    #[must_use]
    pub fn stage(&self) -> FitStage {
        self.stage.load()
    }

    /// Fits the model to `data`, or returns the existing fit.
    ///
    /// # Errors
    /// Returns [`HdbscanError::Metric`] when the metric cannot handle the
    /// data's dimensionality, [`HdbscanError::Tree`], [`HdbscanError::Mst`]
    /// or [`HdbscanError::Hierarchy`] when a pipeline step fails, and
    /// [`HdbscanError::LockPoisoned`] if an earlier fit panicked.
    pub fn fit(&self, data: SampleMatrix) -> Result<Arc<FittedModel>> {
        let _guard = self
            .fit_lock
            .lock()
            .map_err(|_| HdbscanError::LockPoisoned { resource: "fit" })?;
        if let Some(model) = self.read_fitted()? {
            debug!("model already fitted; ignoring fit");
            return Ok(model);
        }
        self.fit_locked(data)
    }

    /// Discards any fitted state and fits `data` from scratch.
    ///
    /// # Errors
    /// As for [`Hdbscan::fit`].
    pub fn refit(&self, data: SampleMatrix) -> Result<Arc<FittedModel>> {
        let _guard = self
            .fit_lock
            .lock()
            .map_err(|_| HdbscanError::LockPoisoned { resource: "fit" })?;
        *self.write_fitted()? = None;
        self.stage.store(FitStage::Unfit);
        self.fit_locked(data)
    }

    /// Shared handle to the fitted state.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn fitted(&self) -> Result<Arc<FittedModel>> {
        self.read_fitted()?
            .ok_or_else(|| HdbscanError::NotFitted { stage: self.stage() })
    }

    /// Label per point, `-1` for noise.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn labels(&self) -> Result<Vec<i64>> {
        Ok(self.fitted()?.labels().to_vec())
    }

    /// Number of clusters found.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn n_clusters(&self) -> Result<usize> {
        Ok(self.fitted()?.labelling().n_clusters())
    }

    /// Number of points labelled as noise.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn n_noise(&self) -> Result<usize> {
        Ok(self.fitted()?.labelling().n_noise())
    }

    /// Core distance per point.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn core_distances(&self) -> Result<Vec<f64>> {
        Ok(self.fitted()?.core_distances().to_vec())
    }

    /// Mutual-reachability minimum spanning tree.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn mst(&self) -> Result<MinimumSpanningTree> {
        Ok(self.fitted()?.mst().clone())
    }

    /// Single-linkage dendrogram.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn single_linkage_tree(&self) -> Result<SingleLinkageTree> {
        Ok(self.fitted()?.single_linkage_tree().clone())
    }

    /// Condensed cluster tree.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn condensed_tree(&self) -> Result<CondensedTree> {
        Ok(self.fitted()?.condensed_tree().clone())
    }

    /// Stability per condensed cluster.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn stability(&self) -> Result<BTreeMap<usize, f64>> {
        Ok(self.fitted()?.stability().clone())
    }

    /// Membership strength per point.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn probabilities(&self) -> Result<Vec<f64>> {
        Ok(self.fitted()?.probabilities().to_vec())
    }

    /// GLOSH outlier score per point.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn outlier_scores(&self) -> Result<Vec<f64>> {
        Ok(self.fitted()?.outlier_scores().to_vec())
    }

    /// Adjustments made while fitting.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn warnings(&self) -> Result<Vec<FitWarning>> {
        Ok(self.fitted()?.warnings().to_vec())
    }

    /// Algorithm the fit actually used.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn resolved_algorithm(&self) -> Result<Algorithm> {
        Ok(self.fitted()?.algorithm())
    }

    /// Captures the labels and the state behind them.
    ///
    /// # Errors
    /// Returns [`HdbscanError::NotFitted`] before a fit succeeds.
    pub fn snapshot(&self) -> Result<ModelSnapshot> {
        Ok(self.fitted()?.snapshot())
    }

    fn read_fitted(&self) -> Result<Option<Arc<FittedModel>>> {
        let guard = self
            .fitted
            .read()
            .map_err(|_| HdbscanError::LockPoisoned { resource: "fitted model" })?;
        Ok(guard.clone())
    }

    fn write_fitted(&self) -> Result<RwLockWriteGuard<'_, Option<Arc<FittedModel>>>> {
        self.fitted
            .write()
            .map_err(|_| HdbscanError::LockPoisoned { resource: "fitted model" })
    }

    fn advance(&self, stage: FitStage) {
        self.stage.store(stage);
        info!(stage = %stage, "fit stage reached");
    }

    #[instrument(
        name = "hdbscan.fit",
        err,
        skip(self, data),
        fields(
            rows = data.rows(),
            cols = data.cols(),
            min_cluster_size = %self.config.min_cluster_size,
            algorithm = %self.config.algorithm,
        ),
    )]
    fn fit_locked(&self, data: SampleMatrix) -> Result<Arc<FittedModel>> {
        let started = Instant::now();
        self.stage.store(FitStage::Unfit);
        let model = Arc::new(self.compute(data)?);
        *self.write_fitted()? = Some(Arc::clone(&model));
        self.advance(FitStage::LabelsExtracted);
        telemetry::record_fit(started.elapsed());
        Ok(model)
    }

    fn compute(&self, data: SampleMatrix) -> Result<FittedModel> {
        let config = &self.config;
        let (rows, cols) = (data.rows(), data.cols());
        let (algorithm, metric, warning) = config.algorithm.resolve(config.metric, rows, cols);
        if let Some(fallback) = &warning {
            warn!(warning = %fallback, "metric fallback");
        }
        debug!(algorithm = %algorithm, metric = metric.name(), "resolved algorithm");
        metric.check_dimension(cols)?;

        let (core_distances, mst) = self.spanning_tree(data, algorithm, metric)?;
        self.advance(FitStage::MstBuilt);
        let linkage = SingleLinkageTree::from_mst(&mst)?;
        self.advance(FitStage::DendrogramLabeled);
        let condensed = condense_tree(&linkage, config.min_cluster_size);
        self.advance(FitStage::Condensed);
        let stability = compute_stability(&condensed);
        self.advance(FitStage::StabilityComputed);

        let labelling = if rows < config.min_cluster_size.get() {
            info!(
                rows,
                min_cluster_size = config.min_cluster_size.get(),
                "fewer points than min_cluster_size; every point is noise"
            );
            Labelling::noise(rows)
        } else {
            let selected = extract_clusters(
                &condensed,
                &stability,
                config.cluster_selection,
                config.allow_single_cluster,
            );
            assign_labels(&condensed, &selected, config.allow_single_cluster)
        };
        let probabilities = membership_probabilities(&condensed, &labelling);
        let scores = outlier_scores(&condensed);
        info!(
            clusters = labelling.n_clusters(),
            noise = labelling.n_noise(),
            "labels extracted"
        );

        Ok(FittedModel {
            labelling,
            core_distances,
            mst,
            linkage,
            condensed,
            stability,
            probabilities,
            outlier_scores: scores,
            warnings: warning.into_iter().collect(),
            algorithm,
            metric,
        })
    }

    fn spanning_tree(
        &self,
        data: SampleMatrix,
        algorithm: Algorithm,
        metric: Metric,
    ) -> Result<(Vec<f64>, MinimumSpanningTree)> {
        let config = &self.config;
        let leaf_size = config.leaf_size.get();
        match algorithm {
            Algorithm::Auto | Algorithm::Generic => {
                let distances = DistanceMatrix::from_samples(&data, &metric, &config.context);
                let core = distances.core_distances(config.min_samples.get());
                self.advance(FitStage::CoreDistancesComputed);
                let reachability = distances.mutual_reachability_with_core(&core, config.alpha);
                Ok((core, generic_prim(&reachability)?))
            }
            Algorithm::PrimKdTree | Algorithm::BoruvkaKdTree => {
                let tree = KdTree::build(data, leaf_size, metric)?
                    .with_execution_context(config.context);
                self.tree_spanning_tree(&tree, algorithm)
            }
            Algorithm::PrimBallTree | Algorithm::BoruvkaBallTree => {
                let tree = BallTree::build(data, leaf_size, metric)?
                    .with_execution_context(config.context);
                self.tree_spanning_tree(&tree, algorithm)
            }
        }
    }

    fn tree_spanning_tree<B: NodeBounds>(
        &self,
        tree: &BinaryTree<B>,
        algorithm: Algorithm,
    ) -> Result<(Vec<f64>, MinimumSpanningTree)> {
        let config = &self.config;
        let core = tree_core_distances(tree, config.min_samples.get())?;
        self.advance(FitStage::CoreDistancesComputed);
        let mst = if matches!(algorithm, Algorithm::PrimKdTree | Algorithm::PrimBallTree) {
            tree_prim(tree, &core, config.alpha, &config.context)?
        } else {
            boruvka(tree, &core, config.alpha, &config.context)?
        };
        Ok((core, mst))
    }
}

//! Flat, serialisable tree state.

use super::{BinaryTree, NodeBounds, NodeData, TreeError, children, level_count};
use crate::{
    error::MetricError,
    matrix::SampleMatrix,
    metric::{DistanceMetric, Metric},
    parallel::ExecutionContext,
};

/// Everything needed to restore a tree without rebuilding it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeSnapshot {
    /// Row-major samples.
    pub data: Vec<f64>,
    /// Number of samples.
    pub n_samples: usize,
    /// Features per sample.
    pub n_features: usize,
    /// Leaf size used at construction.
    pub leaf_size: usize,
    /// Tree metric.
    pub metric: Metric,
    /// Sample permutation.
    pub index_array: Vec<usize>,
    /// Per-node ranges and radii.
    pub node_data: Vec<NodeData>,
    /// Flattened per-node bounds.
    pub bounds: Vec<f64>,
}

impl<B: NodeBounds> BinaryTree<B> {
    /// Captures the tree state.
    #[must_use]
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            data: self.data.as_slice().to_vec(),
            n_samples: self.data.rows(),
            n_features: self.data.cols(),
            leaf_size: self.leaf_size,
            metric: self.metric,
            index_array: self.index_array.clone(),
            node_data: self.node_data.clone(),
            bounds: self.bounds.to_flat(),
        }
    }

    /// Restores a tree from a snapshot, validating its structure.
    ///
    /// # Errors
    /// Returns [`TreeError::InvalidSnapshot`] when the permutation, node
    /// layout or bounds are inconsistent, and the matrix or metric errors of
    /// [`BinaryTree::build`] for invalid data or metrics.
    ///
    /// # Examples
    /// ```
    /// use bunrui_core::{BallTree, Metric, SampleMatrix};
    ///
    /// let data = SampleMatrix::from_rows(&[vec![0.0], vec![1.0], vec![4.0]])?;
    /// let tree = BallTree::build(data, 1, Metric::Manhattan)?;
    /// let restored = BallTree::from_snapshot(tree.snapshot())?;
    /// assert_eq!(restored.index_array(), tree.index_array());
    ///
    /// let mut broken = tree.snapshot();
    /// broken.index_array[0] = broken.index_array[1];
    /// assert!(BallTree::from_snapshot(broken).is_err());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_snapshot(snapshot: TreeSnapshot) -> Result<Self, TreeError> {
        let TreeSnapshot {
            data,
            n_samples,
            n_features,
            leaf_size,
            metric,
            index_array,
            node_data,
            bounds,
        } = snapshot;
        let data = SampleMatrix::from_flat(n_samples, n_features, data)?;
        if leaf_size == 0 {
            return Err(TreeError::InvalidLeafSize { got: leaf_size });
        }
        let metric = metric.validate()?;
        if !B::supports(&metric) {
            return Err(MetricError::UnsupportedForTree {
                metric: metric.name(),
                tree: B::NAME,
            }
            .into());
        }
        check_permutation(&index_array, n_samples)?;
        let n_levels = level_count(n_samples, leaf_size);
        let n_nodes = (1_usize << n_levels) - 1;
        if node_data.len() != n_nodes {
            return Err(invalid(format!(
                "expected {n_nodes} nodes, found {}",
                node_data.len()
            )));
        }
        check_nodes(&node_data, n_samples)?;
        let bounds = B::from_flat(n_nodes, n_features, bounds)?;
        Ok(Self {
            data,
            index_array,
            node_data,
            bounds,
            leaf_size,
            n_levels,
            metric,
            context: ExecutionContext::default(),
        })
    }
}

fn invalid(reason: String) -> TreeError {
    TreeError::InvalidSnapshot { reason }
}

fn check_permutation(index_array: &[usize], n_samples: usize) -> Result<(), TreeError> {
    if index_array.len() != n_samples {
        return Err(invalid(format!(
            "index array has {} entries for {n_samples} samples",
            index_array.len()
        )));
    }
    let mut seen = vec![false; n_samples];
    for &index in index_array {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => return Err(invalid(format!("sample {index} appears twice"))),
            None => return Err(invalid(format!("sample {index} is out of range"))),
        }
    }
    Ok(())
}

/// Walks the reachable nodes and checks their ranges nest exactly.
fn check_nodes(node_data: &[NodeData], n_samples: usize) -> Result<(), TreeError> {
    let root = node_data
        .first()
        .ok_or_else(|| invalid("tree has no root".to_owned()))?;
    if root.start != 0 || root.end != n_samples {
        return Err(invalid(format!(
            "root covers {}..{} instead of 0..{n_samples}",
            root.start, root.end
        )));
    }
    let mut pending = vec![0_usize];
    while let Some(node) = pending.pop() {
        let info = node_data[node];
        if info.is_empty() || !info.radius.is_finite() || info.radius < 0.0 {
            return Err(invalid(format!("node {node} is empty or has an invalid radius")));
        }
        if info.is_leaf {
            continue;
        }
        let (left, right) = children(node);
        let (Some(left_info), Some(right_info)) = (node_data.get(left), node_data.get(right))
        else {
            return Err(invalid(format!("internal node {node} has no children")));
        };
        if left_info.start != info.start
            || left_info.end != right_info.start
            || right_info.end != info.end
        {
            return Err(invalid(format!(
                "children of node {node} do not partition {}..{}",
                info.start, info.end
            )));
        }
        pending.extend([left, right]);
    }
    Ok(())
}

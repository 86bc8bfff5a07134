//! Radius searches and two-point correlation.

use tracing::instrument;

use super::{BinaryTree, NodeBounds, TreeError, check_radius, children, knn::Neighborhood};
use crate::{matrix::SampleMatrix, metric::DistanceMetric};

impl<B: NodeBounds> BinaryTree<B> {
    /// Collects every sample within `radius` of each query row.
    ///
    /// Nodes entirely outside the radius are pruned and nodes entirely
    /// inside it are accepted without testing individual samples.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`] or
    /// [`TreeError::InvalidRadius`].
    #[instrument(
        name = "tree.query_radius",
        err,
        skip(self, points),
        fields(tree = B::NAME, queries = points.rows()),
    )]
    pub fn query_radius(
        &self,
        points: &SampleMatrix,
        radius: f64,
        sort: bool,
    ) -> Result<Neighborhood, TreeError> {
        self.check_points(points)?;
        check_radius(radius)?;
        let reduced_radius = self.metric.distance_to_partial(radius);
        let rows = self.context.map_rows(points.rows(), |row| {
            let point = points.row(row);
            let mut hits = Vec::new();
            self.collect_within(0, point, radius, reduced_radius, &mut hits);
            if sort {
                hits.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            }
            hits
        });
        let (indices, distances) = rows
            .into_iter()
            .map(|hits| hits.into_iter().unzip::<usize, f64, Vec<_>, Vec<_>>())
            .unzip();
        Ok(Neighborhood::new(distances, indices))
    }

    /// Counts the samples within `radius` of each query row.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`] or
    /// [`TreeError::InvalidRadius`].
    #[instrument(
        name = "tree.query_radius",
        err,
        skip(self, points),
        fields(tree = B::NAME, queries = points.rows(), count_only = true),
    )]
    pub fn query_radius_count(
        &self,
        points: &SampleMatrix,
        radius: f64,
    ) -> Result<Vec<usize>, TreeError> {
        self.check_points(points)?;
        check_radius(radius)?;
        let reduced_radius = self.metric.distance_to_partial(radius);
        Ok(self.context.map_rows(points.rows(), |row| {
            self.count_within(0, points.row(row), radius, reduced_radius)
        }))
    }

    fn collect_within(
        &self,
        node: usize,
        point: &[f64],
        radius: f64,
        reduced_radius: f64,
        hits: &mut Vec<(usize, f64)>,
    ) {
        let info = self.node_data[node];
        if self.min_dist(node, point) > radius {
            return;
        }
        let members = &self.index_array[info.start..info.end];
        if self.max_dist(node, point) <= radius {
            hits.extend(
                members
                    .iter()
                    .map(|&index| (index, self.metric.distance(point, self.data.row(index)))),
            );
        } else if info.is_leaf {
            for &index in members {
                let reduced = self.metric.partial_distance(point, self.data.row(index));
                if reduced <= reduced_radius {
                    hits.push((index, self.metric.partial_to_distance(reduced)));
                }
            }
        } else {
            let (left, right) = children(node);
            self.collect_within(left, point, radius, reduced_radius, hits);
            self.collect_within(right, point, radius, reduced_radius, hits);
        }
    }

    fn count_within(&self, node: usize, point: &[f64], radius: f64, reduced_radius: f64) -> usize {
        let info = self.node_data[node];
        if self.min_dist(node, point) > radius {
            0
        } else if self.max_dist(node, point) <= radius {
            info.len()
        } else if info.is_leaf {
            self.index_array[info.start..info.end]
                .iter()
                .filter(|&&index| {
                    self.metric.partial_distance(point, self.data.row(index)) <= reduced_radius
                })
                .count()
        } else {
            let (left, right) = children(node);
            self.count_within(left, point, radius, reduced_radius)
                + self.count_within(right, point, radius, reduced_radius)
        }
    }

    /// For each radius, counts the `(query, sample)` pairs whose distance
    /// is at most that radius.
    ///
    /// # Errors
    /// Returns [`TreeError::DimensionMismatch`] or
    /// [`TreeError::InvalidRadius`].
    ///
    /// # Examples
    /// ```
    /// use bunrui_core::{KdTree, Metric, SampleMatrix};
    ///
    /// let data = SampleMatrix::from_rows(&[vec![0.0], vec![1.0], vec![3.0]])?;
    /// let tree = KdTree::build(data.clone(), 1, Metric::Euclidean)?;
    /// let counts = tree.two_point_correlation(&data, &[0.5, 2.0, 1.0])?;
    /// assert_eq!(counts, vec![3, 7, 5]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn two_point_correlation(
        &self,
        points: &SampleMatrix,
        radii: &[f64],
    ) -> Result<Vec<usize>, TreeError> {
        self.check_points(points)?;
        for &radius in radii {
            check_radius(radius)?;
        }
        let mut order: Vec<usize> = (0..radii.len()).collect();
        order.sort_unstable_by(|&a, &b| radii[a].total_cmp(&radii[b]));
        let sorted: Vec<f64> = order.iter().map(|&position| radii[position]).collect();

        let per_query = self.context.map_rows(points.rows(), |row| {
            let mut counts = vec![0; sorted.len()];
            self.correlate(0, points.row(row), &sorted, &mut counts, 0, sorted.len());
            counts
        });
        let mut sorted_counts = vec![0; sorted.len()];
        for counts in per_query {
            for (total, count) in sorted_counts.iter_mut().zip(counts) {
                *total += count;
            }
        }
        let mut counts = vec![0; radii.len()];
        for (position, count) in order.into_iter().zip(sorted_counts) {
            counts[position] = count;
        }
        Ok(counts)
    }

    /// Adds pair counts for `radii[lo..hi]`, narrowing the active window
    /// as radii are resolved for the whole node.
    fn correlate(
        &self,
        node: usize,
        point: &[f64],
        radii: &[f64],
        counts: &mut [usize],
        mut lo: usize,
        mut hi: usize,
    ) {
        let info = self.node_data[node];
        let lower = self.min_dist(node, point);
        let upper = self.max_dist(node, point);
        while lo < hi && radii[lo] < lower {
            lo += 1;
        }
        while hi > lo && radii[hi - 1] >= upper {
            counts[hi - 1] += info.len();
            hi -= 1;
        }
        if lo >= hi {
            return;
        }
        if info.is_leaf {
            for &index in &self.index_array[info.start..info.end] {
                let distance = self.metric.distance(point, self.data.row(index));
                for position in (lo..hi).rev() {
                    if distance > radii[position] {
                        break;
                    }
                    counts[position] += 1;
                }
            }
        } else {
            let (left, right) = children(node);
            self.correlate(left, point, radii, counts, lo, hi);
            self.correlate(right, point, radii, counts, lo, hi);
        }
    }
}

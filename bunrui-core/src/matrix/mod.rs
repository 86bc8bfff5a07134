//! Dense numeric containers consumed by the trees and the clustering model.
//!
//! [`SampleMatrix`] is the immutable `m x n` point set every fit and query
//! works against. [`DistanceMatrix`] is the square pairwise form used by the
//! dense clustering path, together with the core-distance and
//! mutual-reachability transforms defined over it.

use crate::{error::MatrixError, metric::DistanceMetric, parallel::ExecutionContext};

/// Immutable, row-major matrix of finite samples.
///
/// # Examples
/// ```
/// use bunrui_core::SampleMatrix;
///
/// let samples = SampleMatrix::from_rows(&[vec![0.0, 1.0], vec![2.0, 3.0]])?;
/// assert_eq!(samples.rows(), 2);
/// assert_eq!(samples.cols(), 2);
/// assert_eq!(samples.row(1), &[2.0, 3.0]);
/// # Ok::<(), bunrui_core::MatrixError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSampleMatrix"))]
pub struct SampleMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

/// Unchecked wire form of [`SampleMatrix`]; deserialisation validates it
/// through [`SampleMatrix::from_flat`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawSampleMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSampleMatrix> for SampleMatrix {
    type Error = MatrixError;

    fn try_from(raw: RawSampleMatrix) -> Result<Self, Self::Error> {
        Self::from_flat(raw.rows, raw.cols, raw.data)
    }
}

impl SampleMatrix {
    /// Builds a matrix from a slice of rows.
    ///
    /// # Errors
    /// Returns [`MatrixError::Empty`] for no rows,
    /// [`MatrixError::ZeroDimension`] when the first row is empty,
    /// [`MatrixError::Ragged`] when row lengths differ, and
    /// [`MatrixError::NonFinite`] for NaN or infinite values.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, MatrixError> {
        let first = rows.first().ok_or(MatrixError::Empty)?;
        let cols = first.as_ref().len();
        if cols == 0 {
            return Err(MatrixError::ZeroDimension);
        }
        let mut data = Vec::with_capacity(rows.len().saturating_mul(cols));
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != cols {
                return Err(MatrixError::Ragged {
                    row,
                    expected: cols,
                    actual: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Self::from_flat(rows.len(), cols, data)
    }

    /// Builds a matrix from a row-major buffer.
    ///
    /// # Errors
    /// Returns [`MatrixError::LengthMismatch`] when `data.len() != rows * cols`
    /// in addition to the errors documented on [`Self::from_rows`].
    pub fn from_flat(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, MatrixError> {
        if rows == 0 {
            return Err(MatrixError::Empty);
        }
        if cols == 0 {
            return Err(MatrixError::ZeroDimension);
        }
        let expected = rows.saturating_mul(cols);
        if data.len() != expected {
            return Err(MatrixError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        check_finite(&data, cols)?;
        Ok(Self { data, rows, cols })
    }

    /// Number of samples.
    #[must_use]
    #[rustfmt::skip]
    pub fn rows(&self) -> usize { self.rows }

    /// Number of features per sample.
    #[must_use]
    #[rustfmt::skip]
    pub fn cols(&self) -> usize { self.cols }

    /// Returns the features of sample `index`.
    ///
    /// # Panics
    /// Panics when `index >= self.rows()`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Returns the features of sample `index`, or `None` when out of range.
    #[must_use]
    pub fn get_row(&self, index: usize) -> Option<&[f64]> {
        (index < self.rows).then(|| self.row(index))
    }

    /// Iterates over rows in order.
    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.cols)
    }

    /// Returns the row-major backing buffer.
    #[must_use]
    #[rustfmt::skip]
    pub fn as_slice(&self) -> &[f64] { &self.data }
}

fn check_finite(data: &[f64], cols: usize) -> Result<(), MatrixError> {
    match data.iter().position(|value| !value.is_finite()) {
        Some(position) => Err(MatrixError::NonFinite {
            row: position / cols,
            column: position % cols,
        }),
        None => Ok(()),
    }
}

/// Square matrix of pairwise distances.
///
/// Symmetry is not enforced; every transform reads `(i, j)` exactly as
/// stored.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DistanceMatrix {
    /// Builds a distance matrix from explicit rows.
    ///
    /// # Errors
    /// Returns [`MatrixError::NotSquare`] when the row count differs from the
    /// column count, plus the validation errors of [`SampleMatrix::from_rows`].
    ///
    /// # Examples
    /// ```
    /// use bunrui_core::DistanceMatrix;
    ///
    /// let matrix = DistanceMatrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]])?;
    /// assert_eq!(matrix.size(), 2);
    /// assert_eq!(matrix.get(0, 1), 1.0);
    /// # Ok::<(), bunrui_core::MatrixError>(())
    /// ```
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, MatrixError> {
        let samples = SampleMatrix::from_rows(rows)?;
        if samples.rows() != samples.cols() {
            return Err(MatrixError::NotSquare {
                rows: samples.rows(),
                cols: samples.cols(),
            });
        }
        Ok(Self {
            size: samples.rows(),
            data: samples.data,
        })
    }

    /// Computes all pairwise distances between the rows of `samples`.
    ///
    /// Rows are filled in contiguous chunks, in parallel when `context`
    /// allows it.
    #[must_use]
    pub fn from_samples<M>(samples: &SampleMatrix, metric: &M, context: &ExecutionContext) -> Self
    where
        M: DistanceMetric + ?Sized,
    {
        let size = samples.rows();
        let mut data = vec![0.0; size.saturating_mul(size)];
        context.for_each_row_chunk(&mut data, size, |first_row, chunk| {
            for (offset, out_row) in chunk.chunks_exact_mut(size).enumerate() {
                let left = samples.row(first_row + offset);
                for (column, slot) in out_row.iter_mut().enumerate() {
                    *slot = metric.distance(left, samples.row(column));
                }
            }
        });
        Self { data, size }
    }

    /// Number of rows (and columns).
    #[must_use]
    #[rustfmt::skip]
    pub fn size(&self) -> usize { self.size }

    /// Returns the entry at `(row, column)`.
    ///
    /// # Panics
    /// Panics when either index is out of range.
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> f64 {
        assert!(column < self.size, "column {column} out of range");
        self.data[row * self.size + column]
    }

    /// Returns row `index`.
    ///
    /// # Panics
    /// Panics when `index` is out of range.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.size;
        &self.data[start..start + self.size]
    }

    /// Iterates over rows in order.
    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.size)
    }

    /// Computes per-point core distances.
    ///
    /// The core distance of point `j` is the `k`-th smallest entry of column
    /// `j` (0-indexed, the point's own zero distance included), where
    /// `k = min(min_samples, size - 1)`.
    ///
    /// # Examples
    /// ```
    /// use bunrui_core::DistanceMatrix;
    ///
    /// let matrix = DistanceMatrix::from_rows(&[
    ///     vec![1.0, 2.0, 3.0],
    ///     vec![4.0, 5.0, 6.0],
    ///     vec![7.0, 8.0, 9.0],
    /// ])?;
    /// assert_eq!(matrix.core_distances(3), vec![7.0, 8.0, 9.0]);
    /// # Ok::<(), bunrui_core::MatrixError>(())
    /// ```
    #[must_use]
    pub fn core_distances(&self, min_samples: usize) -> Vec<f64> {
        let k = min_samples.min(self.size.saturating_sub(1));
        let mut column = Vec::with_capacity(self.size);
        (0..self.size)
            .map(|j| {
                column.clear();
                column.extend(self.iter_rows().map(|row| row[j]));
                let (_, kth, _) = column.select_nth_unstable_by(k, f64::total_cmp);
                *kth
            })
            .collect()
    }

    /// Computes the mutual-reachability matrix for `min_samples`.
    ///
    /// `mr(i, j) = max(core(i), core(j), d(i, j))`.
    ///
    /// # Examples
    /// ```
    /// use bunrui_core::DistanceMatrix;
    ///
    /// let matrix = DistanceMatrix::from_rows(&[
    ///     vec![1.0, 2.0, 3.0],
    ///     vec![4.0, 5.0, 6.0],
    ///     vec![7.0, 8.0, 9.0],
    /// ])?;
    /// let reachability = matrix.mutual_reachability(3);
    /// assert_eq!(reachability.row(0), &[7.0, 8.0, 9.0]);
    /// assert_eq!(reachability.row(1), &[8.0, 8.0, 9.0]);
    /// assert_eq!(reachability.row(2), &[9.0, 9.0, 9.0]);
    /// # Ok::<(), bunrui_core::MatrixError>(())
    /// ```
    #[must_use]
    pub fn mutual_reachability(&self, min_samples: usize) -> Self {
        let core = self.core_distances(min_samples);
        self.mutual_reachability_with_core(&core, 1.0)
    }

    /// Builds the mutual-reachability matrix from precomputed core distances,
    /// scaling raw distances by `1 / alpha` first.
    ///
    /// # Panics
    /// Panics when `core.len() != self.size()`.
    #[must_use]
    pub fn mutual_reachability_with_core(&self, core: &[f64], alpha: f64) -> Self {
        assert_eq!(core.len(), self.size, "one core distance per point");
        let data = self
            .iter_rows()
            .zip(core)
            .flat_map(|(row, &core_i)| {
                row.iter()
                    .zip(core)
                    .map(move |(&distance, &core_j)| (distance / alpha).max(core_i).max(core_j))
            })
            .collect();
        Self {
            data,
            size: self.size,
        }
    }
}

#[cfg(test)]
mod tests;

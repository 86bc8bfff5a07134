//! Seeded blob datasets for benchmarking.
//!
//! Points are spread uniformly inside axis-aligned boxes around randomly
//! placed centres, which gives HDBSCAN well separated dense regions to find.

use bunrui_core::SampleMatrix;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::error::BenchSetupError;

/// Side length of the cube the blob centres are drawn from.
const CENTRE_RANGE: f64 = 100.0;

/// Errors that may occur during synthetic data generation.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum SyntheticError {
    /// The requested point count was zero.
    #[error("point count must be greater than zero")]
    ZeroPoints,
    /// The requested dimension count was zero.
    #[error("dimension count must be greater than zero")]
    ZeroDimensions,
    /// The requested blob count was zero.
    #[error("blob count must be greater than zero")]
    ZeroBlobs,
    /// The spread was not a positive finite number.
    #[error("spread must be positive and finite (got {spread})")]
    InvalidSpread {
        /// The rejected spread.
        spread: f64,
    },
}

/// Configuration for blob generation.
#[derive(Clone, Debug)]
pub struct BlobConfig {
    /// Number of points to generate.
    pub point_count: usize,
    /// Dimensionality of each point.
    pub dimensions: usize,
    /// Number of blobs the points are dealt across.
    pub blobs: usize,
    /// Half-width of the box each blob fills.
    pub spread: f64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

impl BlobConfig {
    /// Three two-dimensional blobs of unit spread.
    #[must_use]
    pub const fn planar(point_count: usize, seed: u64) -> Self {
        Self {
            point_count,
            dimensions: 2,
            blobs: 3,
            spread: 1.0,
            seed,
        }
    }

    fn validate(&self) -> Result<(), SyntheticError> {
        if self.point_count == 0 {
            return Err(SyntheticError::ZeroPoints);
        }
        if self.dimensions == 0 {
            return Err(SyntheticError::ZeroDimensions);
        }
        if self.blobs == 0 {
            return Err(SyntheticError::ZeroBlobs);
        }
        if !(self.spread.is_finite() && self.spread > 0.0) {
            return Err(SyntheticError::InvalidSpread {
                spread: self.spread,
            });
        }
        Ok(())
    }
}

/// Generates a sample matrix of blobs from `config`.
///
/// Point `i` belongs to blob `i % blobs`, so consecutive rows cycle through
/// the blobs.
///
/// # Errors
///
/// Returns [`BenchSetupError::Synthetic`] when the configuration is invalid.
///
/// # Examples
///
/// ```
/// use bunrui_benches::source::{BlobConfig, generate_blobs};
///
/// let data = generate_blobs(&BlobConfig::planar(12, 7)).expect("valid config");
/// assert_eq!((data.rows(), data.cols()), (12, 2));
/// ```
#[expect(
    clippy::float_arithmetic,
    reason = "points are offsets from their blob centre"
)]
pub fn generate_blobs(config: &BlobConfig) -> Result<SampleMatrix, BenchSetupError> {
    config.validate()?;
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let centres: Vec<Vec<f64>> = (0..config.blobs)
        .map(|_| {
            (0..config.dimensions)
                .map(|_| rng.gen_range(0.0..CENTRE_RANGE))
                .collect()
        })
        .collect();

    let mut data = Vec::with_capacity(config.point_count.saturating_mul(config.dimensions));
    for centre in centres.iter().cycle().take(config.point_count) {
        for &coordinate in centre {
            data.push(coordinate + rng.gen_range(-config.spread..config.spread));
        }
    }
    Ok(SampleMatrix::from_flat(
        config.point_count,
        config.dimensions,
        data,
    )?)
}

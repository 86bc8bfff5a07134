//! Shared test utilities for `bunrui-core`.

use bunrui_test_support::ci::property_test_profile::ProptestRunProfile;
use proptest::test_runner::Config as ProptestConfig;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::matrix::SampleMatrix;

/// Builds a standard proptest configuration from the shared CI profile.
///
/// This keeps property suites aligned on the same `PROGTEST_CASES` and
/// `BUNRUI_PBT_FORK` interpretation.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

/// Uniform random samples in `[-10, 10)^cols`, reproducible from `seed`.
pub(crate) fn uniform_samples(seed: u64, rows: usize, cols: usize) -> SampleMatrix {
    let mut rng = SmallRng::seed_from_u64(seed);
    let data = (0..rows * cols)
        .map(|_| rng.gen_range(-10.0..10.0))
        .collect();
    SampleMatrix::from_flat(rows, cols, data).expect("generated samples are valid")
}

/// Well separated blobs: `per_blob` points around each of `centres`.
pub(crate) fn blob_samples(seed: u64, centres: &[[f64; 2]], per_blob: usize) -> SampleMatrix {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(centres.len() * per_blob * 2);
    for centre in centres {
        for _ in 0..per_blob {
            data.push(centre[0] + rng.gen_range(-0.5..0.5));
            data.push(centre[1] + rng.gen_range(-0.5..0.5));
        }
    }
    SampleMatrix::from_flat(centres.len() * per_blob, 2, data)
        .expect("generated samples are valid")
}

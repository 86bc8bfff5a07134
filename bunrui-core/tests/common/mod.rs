//! Fixtures shared by the integration suites.

use bunrui_core::SampleMatrix;
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Centres of three well separated blobs.
pub const CENTRES: [[f64; 2]; 3] = [[0.0, 0.0], [25.0, 0.0], [0.0, 25.0]];

/// `per_blob` points uniformly spread within half a unit of each centre.
#[must_use]
pub fn blobs(seed: u64, per_blob: usize) -> SampleMatrix {
    let mut rng = SmallRng::seed_from_u64(seed);
    let rows: Vec<Vec<f64>> = CENTRES
        .iter()
        .flat_map(|centre| std::iter::repeat_n(centre, per_blob))
        .map(|centre| {
            vec![
                centre[0] + rng.gen_range(-0.5..0.5),
                centre[1] + rng.gen_range(-0.5..0.5),
            ]
        })
        .collect();
    SampleMatrix::from_rows(&rows).expect("generated rows are valid")
}

/// Three points too spread out to form a cluster on their own.
#[must_use]
pub fn sparse_triple() -> SampleMatrix {
    SampleMatrix::from_rows(&[
        vec![0.0, 1.0, 0.0, 2.0],
        vec![0.0, 0.0, 1.0, 2.0],
        vec![5.0, 6.0, 7.0, 4.0],
    ])
    .expect("valid rows")
}

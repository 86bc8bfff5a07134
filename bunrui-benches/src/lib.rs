//! Benchmark support crate for bunrui.
//!
//! Provides seeded blob datasets and parameter types used by the Criterion
//! benchmarks for neighbour queries, spanning tree construction and full
//! HDBSCAN fits.

pub mod error;
pub mod params;
pub mod source;

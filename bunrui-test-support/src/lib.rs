//! Shared test utilities used across bunrui crates.
//!
//! [`tracing::RecordingLayer`] captures spans and events so suites can
//! assert instrumentation, and [`ci::property_test_profile`] reads the
//! environment overrides that tune property-test runs.

pub mod ci;
pub mod tracing;

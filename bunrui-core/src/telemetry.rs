//! Optional counters and histograms exported through the `metrics` facade.
//!
//! With the `metrics` feature disabled every recorder compiles to a no-op.

use std::time::Duration;

#[cfg(feature = "metrics")]
pub(crate) fn record_fit(elapsed: Duration) {
    metrics::counter!("bunrui_fit_total").increment(1);
    metrics::histogram!("bunrui_fit_seconds").record(elapsed.as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_fit(_elapsed: Duration) {}

#[cfg(feature = "metrics")]
pub(crate) fn record_tree_build() {
    metrics::counter!("bunrui_tree_builds_total").increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_tree_build() {}

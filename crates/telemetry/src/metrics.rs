//! Metrics implementation using Prometheus.
//!
//! The `track_*` helpers are no-ops until a recorder is installed, so
//! library code can call them unconditionally.

use aggregator_core::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Count one upstream fetch. `outcome` is `"present"` or a failure cause.
pub fn track_fetch(source: &'static str, outcome: &'static str) {
    metrics::counter!(
        "aggregator_source_fetch_total",
        "source" => source,
        "outcome" => outcome
    )
    .increment(1);
}

/// Count one cache lookup: `"hit"`, `"miss"` or `"error"`.
pub fn track_cache(source: &'static str, outcome: &'static str) {
    metrics::counter!(
        "aggregator_cache_lookup_total",
        "source" => source,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one aggregation request and its latency.
pub fn track_aggregation(outcome: &'static str, latency: Duration) {
    metrics::counter!("aggregator_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("aggregator_request_duration_seconds", "outcome" => outcome)
        .record(latency.as_secs_f64());
}

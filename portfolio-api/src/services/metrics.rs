//! Metrics collection for portfolio-api.
//!
//! A single Prometheus recorder backs both the request middleware in
//! service-core and the per-proxy outcome counters below.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once; only the
/// first call installs anything.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record the outcome of a recognition request.
pub fn record_recognition(provider: &'static str, outcome: &'static str) {
    counter!("recognition_requests_total", "provider" => provider, "outcome" => outcome)
        .increment(1);
}

/// Record the outcome of a grading request.
pub fn record_ssl_grade(outcome: &'static str) {
    counter!("ssl_grade_requests_total", "outcome" => outcome).increment(1);
}

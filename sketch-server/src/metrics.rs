//! Prometheus metrics for sketch-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const TRANSFORMS_TOTAL: &str = "sketch_transforms_total";
const TRANSFORM_DURATION: &str = "sketch_transform_duration_seconds";
const UPSCALES_TOTAL: &str = "sketch_upscales_total";
const VISIBILITY_CHANGES_TOTAL: &str = "sketch_visibility_changes_total";

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record a drawing transformation and its end-to-end duration.
pub fn record_transform(success: bool, duration_secs: f64) {
    counter!(TRANSFORMS_TOTAL, "outcome" => outcome(success)).increment(1);
    histogram!(TRANSFORM_DURATION, "outcome" => outcome(success)).record(duration_secs);
}

/// Record an upscale request.
pub fn record_upscale(success: bool) {
    counter!(UPSCALES_TOTAL, "outcome" => outcome(success)).increment(1);
}

/// Record a visibility change request.
///
/// # Arguments
///
/// * `public` - Requested visibility
/// * `success` - Whether the change was applied
pub fn record_visibility_change(public: bool, success: bool) {
    counter!(
        VISIBILITY_CHANGES_TOTAL,
        "public" => public.to_string(),
        "outcome" => outcome(success)
    )
    .increment(1);
}

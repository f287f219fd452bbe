//! Prometheus metrics for Waypoint.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `waypoint_decisions_total` | Counter | `stage`, `outcome` | Decision records produced |
//! | `waypoint_evaluations_total` | Counter | `status` | Pipeline passes by resolved status |
//! | `waypoint_evaluation_duration_seconds` | Histogram | - | Pipeline pass latency |
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;
use waypoint_core::DecisionRecord;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names.
pub mod names {
    /// Decision records produced.
    pub const DECISIONS_TOTAL: &str = "waypoint_decisions_total";
    /// Pipeline passes.
    pub const EVALUATIONS_TOTAL: &str = "waypoint_evaluations_total";
    /// Pipeline pass latency.
    pub const EVALUATION_DURATION: &str = "waypoint_evaluation_duration_seconds";
}

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are recorded.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Installs the Prometheus recorder.
///
/// Calling this more than once is harmless: later calls keep the first
/// recorder.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if another recorder is already
/// installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled || METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

fn register_metric_descriptions() {
    describe_counter!(
        names::DECISIONS_TOTAL,
        "Decision records produced by policy stages"
    );
    describe_counter!(
        names::EVALUATIONS_TOTAL,
        "Pipeline passes by resolved status code"
    );
    describe_histogram!(
        names::EVALUATION_DURATION,
        metrics::Unit::Seconds,
        "Pipeline pass latency"
    );
}

/// Renders all metrics in Prometheus text format.
///
/// Returns `None` when metrics were never initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Records one decision record.
pub fn record_decision(record: &DecisionRecord) {
    let outcome = record.outcome.map_or("none", |o| o.as_str());
    counter!(
        names::DECISIONS_TOTAL,
        "stage" => record.stage.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Records a completed pipeline pass.
pub fn record_evaluation(status: u16, duration: Duration) {
    counter!(names::EVALUATIONS_TOTAL, "status" => status.to_string()).increment(1);
    histogram!(names::EVALUATION_DURATION).record(duration.as_secs_f64());
}

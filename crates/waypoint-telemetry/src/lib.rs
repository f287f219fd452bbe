//! Observability for Waypoint.
//!
//! - **Logging**: structured JSON or pretty logs via `tracing-subscriber`
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//! - **Decision log**: the [`TelemetrySink`] that keeps every
//!   [`DecisionRecord`](waypoint_core::DecisionRecord) of a session and
//!   exports it as plain text
//!
//! # Example
//!
//! ```rust,ignore
//! use waypoint_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::default())?;
//! ```

#![doc(html_root_url = "https://docs.rs/waypoint-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, render_metrics, MetricsConfig};
pub use sink::{export_file_name, LogStats, TelemetrySink};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Combined telemetry settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Logging settings.
    pub logging: LogConfig,
    /// Metrics settings.
    pub metrics: MetricsConfig,
}

/// Initializes logging and metrics.
///
/// # Errors
///
/// Returns the first initialization failure.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    tracing::debug!(
        json = config.logging.json,
        metrics = config.metrics.enabled,
        "Telemetry initialized"
    );
    Ok(())
}

//! Structured logging.
//!
//! One `fmt` layer on a `tracing-subscriber` registry. Production writes one
//! JSON object per event; development writes pretty, coloured output. A
//! `RUST_LOG` variable in the environment takes precedence over the
//! configured filter.
//!
//! ```rust,ignore
//! use waypoint_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(path = "/dashboard", status = 401, "Pipeline resolved");
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Install a subscriber at all.
    pub enabled: bool,
    /// `EnvFilter` directive, e.g. `info` or `waypoint_middleware=debug,warn`.
    pub filter: String,
    /// JSON lines instead of pretty output.
    pub json: bool,
    /// ANSI colours; ignored for JSON.
    pub ansi: bool,
    /// Include file and line of the event.
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: "info".to_string(),
            json: true,
            ansi: false,
            source_location: false,
        }
    }
}

impl LogConfig {
    /// Pretty, coloured, debug-level output with source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            filter: "debug".to_string(),
            json: false,
            ansi: true,
            source_location: true,
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter does not parse or a
/// global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.trim().is_empty() => env_filter(&directive)?,
        _ => env_filter(&config.filter)?,
    };

    let layer: BoxedLayer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` naming the bad directive.
pub fn env_filter(directive: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid filter '{directive}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let production = LogConfig::default();
        assert!(production.json);
        assert_eq!(production.filter, "info");

        let development = LogConfig::development();
        assert!(!development.json);
        assert!(development.source_location);
    }

    #[test]
    fn test_env_filter() {
        assert!(env_filter("waypoint_middleware=debug,warn").is_ok());

        let err = env_filter("waypoint=loud").unwrap_err();
        assert!(err.to_string().contains("waypoint=loud"));
    }

    #[test]
    fn test_disabled_logging_installs_nothing() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}

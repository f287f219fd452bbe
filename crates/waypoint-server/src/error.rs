//! Error types for the Waypoint server.

use thiserror::Error;
use waypoint_config::ConfigError;
use waypoint_telemetry::TelemetryError;

/// Server-level errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the configured address.
    #[error("Bind error: {0}")]
    Bind(String),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

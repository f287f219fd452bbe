//! Section types.
//!
//! Every section derives `Default` and is deserialized with
//! `#[serde(default)]`, so a file only needs the keys it changes. Unknown
//! keys are rejected.

use serde::{Deserialize, Serialize};
use waypoint_core::geo::{DEFAULT_BLOCKED_COUNTRIES, DEFAULT_COUNTRY};

/// `[server]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    pub http_addr: String,
    /// How long to wait for open connections on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Budget for reading a request body and for answering it, each.
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:3000".to_string(),
            shutdown_timeout_secs: 30,
            request_timeout_ms: 30_000,
        }
    }
}

/// `[policy]`
///
/// ```
/// use waypoint_config::PolicyConfig;
///
/// let policy = PolicyConfig::default();
/// assert_eq!(policy.rate_limit, 10);
/// assert_eq!(policy.blocked_countries, vec!["CN", "KP"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Requests allowed per caller before the rate limiter blocks.
    pub rate_limit: u32,
    /// Initial state of the maintenance toggle.
    pub maintenance_mode: bool,
    /// ISO country codes refused access to geo-restricted routes.
    pub blocked_countries: Vec<String>,
    /// Country assumed when a request carries no geo header.
    pub default_country: String,
    /// Lifetime of the `request_count` cookie.
    pub request_cookie_max_age_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rate_limit: 10,
            maintenance_mode: false,
            blocked_countries: DEFAULT_BLOCKED_COUNTRIES
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
            default_country: DEFAULT_COUNTRY.to_string(),
            request_cookie_max_age_secs: 3600,
        }
    }
}

/// `[telemetry.metrics]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the Prometheus recorder and serve `/_waypoint/metrics`.
    pub enabled: bool,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human-readable.
    Pretty,
}

/// `[telemetry.logging]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install a subscriber at all.
    pub enabled: bool,
    /// Level or `EnvFilter` directive.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Colour pretty output.
    pub ansi_enabled: bool,
    /// Add file and line to every event.
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            ansi_enabled: false,
            include_location: false,
        }
    }
}

/// `[telemetry]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Reported by the health endpoint and startup log.
    pub service_name: String,
    /// Metrics settings.
    pub metrics: MetricsSection,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: "waypoint".to_string(),
            metrics: MetricsSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

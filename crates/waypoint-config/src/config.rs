//! The top-level [`WaypointConfig`], its presets and validation.

use serde::{Deserialize, Serialize};
use waypoint_core::RouteTable;
use waypoint_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};

use crate::{ConfigError, LogFormat, PolicyConfig, ServerConfig, TelemetryConfigSection};

/// Complete Waypoint configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use waypoint_config::WaypointConfig;
///
/// let config = WaypointConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:3000");
/// assert!(config.routes.is_protected("/dashboard"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct WaypointConfig {
    /// `[server]`
    pub server: ServerConfig,
    /// `[policy]`
    pub policy: PolicyConfig,
    /// `[routes]`, one list per category.
    pub routes: RouteTable,
    /// `[telemetry]`
    pub telemetry: TelemetryConfigSection,
}

impl WaypointConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The server address is not a socket address
    /// - The rate limit is zero
    /// - A country code is not two ASCII letters
    /// - A route entry does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.policy.rate_limit == 0 {
            return Err(ConfigError::invalid(
                "policy.rate_limit",
                "must be greater than zero",
            ));
        }

        if !is_country_code(&self.policy.default_country) {
            return Err(ConfigError::invalid(
                "policy.default_country",
                format!("not an ISO country code: {}", self.policy.default_country),
            ));
        }

        if let Some(bad) = self
            .policy
            .blocked_countries
            .iter()
            .find(|c| !is_country_code(c))
        {
            return Err(ConfigError::invalid(
                "policy.blocked_countries",
                format!("not an ISO country code: {bad}"),
            ));
        }

        let lists = [
            ("routes.public", &self.routes.public),
            ("routes.auth", &self.routes.auth),
            ("routes.protected", &self.routes.protected),
            ("routes.admin", &self.routes.admin),
            ("routes.geo_restricted", &self.routes.geo_restricted),
        ];
        for (field, entries) in lists {
            if let Some(bad) = entries.iter().find(|p| !p.starts_with('/')) {
                return Err(ConfigError::invalid(
                    field,
                    format!("route must start with '/': {bad}"),
                ));
            }
        }

        Ok(())
    }

    /// Logs a warning for every route entry claimed by more than one category.
    ///
    /// Each stage checks its own category, so an overlapping entry is
    /// evaluated by every stage it matches. Returns the number of overlaps.
    pub fn warn_route_overlaps(&self) -> usize {
        let overlaps = self.routes.overlaps();
        for (path, categories) in &overlaps {
            let categories: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
            tracing::warn!(
                path = %path,
                categories = %categories.join(","),
                "Route matches more than one category"
            );
        }
        overlaps.len()
    }

    /// Create a development configuration preset.
    ///
    /// ```
    /// use waypoint_config::WaypointConfig;
    ///
    /// let config = WaypointConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.ansi_enabled = true;
        config.telemetry.logging.include_location = true;
        config
    }

    /// Converts the telemetry section into subscriber settings.
    #[must_use]
    pub fn telemetry_config(&self) -> TelemetryConfig {
        let logging = &self.telemetry.logging;
        TelemetryConfig {
            logging: LogConfig {
                enabled: logging.enabled,
                filter: logging.level.clone(),
                json: logging.format == LogFormat::Json,
                ansi: logging.ansi_enabled,
                source_location: logging.include_location,
            },
            metrics: MetricsConfig {
                enabled: self.telemetry.metrics.enabled,
            },
        }
    }
}

fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

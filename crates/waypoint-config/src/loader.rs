//! Layered loading: preset, then file, then environment.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, LogFormat, WaypointConfig};

/// Environment variable honoured for compatibility with older deployments.
pub const LEGACY_MAINTENANCE_VAR: &str = "MAINTENANCE_MODE";

/// Builds a [`WaypointConfig`] from a preset, an optional file and
/// environment overrides.
///
/// A file is merged over the preset, so keys it leaves out keep the
/// preset's values. `WAYPOINT__*` variables and the legacy `MAINTENANCE_MODE` are
/// applied last, in [`load`](Self::load).
///
/// # Example
///
/// ```no_run
/// use waypoint_config::ConfigLoader;
///
/// # fn main() -> Result<(), waypoint_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("waypoint.toml")?
///     .with_env_prefix("WAYPOINT")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: WaypointConfig,
    env_prefix: Option<String>,
    legacy_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Starts from [`WaypointConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: WaypointConfig::default(),
            env_prefix: None,
            legacy_env: false,
        }
    }

    /// Resets to the built-in defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = WaypointConfig::default();
        self
    }

    /// Resets to the development preset: pretty, coloured debug logs.
    ///
    /// ```
    /// use waypoint_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = WaypointConfig::development();
        self
    }

    /// Merges a `.toml` or `.json` file over the current configuration.
    ///
    /// Keys the file sets win; everything else keeps the value of the
    /// preset chosen before, so `--dev --config f.toml` still logs pretty
    /// output unless `f.toml` says otherwise. Tables merge key by key, while
    /// arrays such as route lists are replaced whole.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let overlay = Self::parse_file(&content, path)?;
        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, overlay);
        self.config = serde_json::from_value(merged)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");

        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`.
    /// For example, with prefix "WAYPOINT":
    /// - `WAYPOINT__SERVER__HTTP_ADDR=0.0.0.0:9000`
    /// - `WAYPOINT__POLICY__RATE_LIMIT=20`
    /// - `WAYPOINT__ROUTES__PROTECTED=/dashboard,/billing`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Honour the bare `MAINTENANCE_MODE` variable.
    ///
    /// Maintenance is switched on only when the variable is exactly `true`.
    #[must_use]
    pub fn with_legacy_env(mut self) -> Self {
        self.legacy_env = true;
        self
    }

    /// Load a `.env` file for environment variables.
    ///
    /// A missing `.env` file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self)
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides, validates the result and
    /// warns about overlapping route categories.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable cannot be parsed or
    /// validation fails.
    pub fn load(mut self) -> Result<WaypointConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        if self.legacy_env {
            self.apply_legacy_maintenance(env::var(LEGACY_MAINTENANCE_VAR).ok().as_deref());
        }

        self.config.validate()?;
        self.config.warn_route_overlaps();

        Ok(self.config)
    }

    /// Parses the file strictly, so unknown keys and bad types are reported
    /// in the file's own format, then returns its raw tree for merging.
    fn parse_file(content: &str, path: &Path) -> Result<Value, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => {
                toml::from_str::<WaypointConfig>(content)?;
                let raw: toml::Value = toml::from_str(content)?;
                Ok(serde_json::to_value(raw)?)
            }
            Some("json") => {
                serde_json::from_str::<WaypointConfig>(content)?;
                Ok(serde_json::from_str(content)?)
            }
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn apply_legacy_maintenance(&mut self, value: Option<&str>) {
        if value == Some("true") {
            self.config.policy.maintenance_mode = true;
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            // Server section
            ["SERVER", "HTTP_ADDR"] => {
                config.server.http_addr = value.to_string();
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse_number(key, value)?;
            }

            // Policy section
            ["POLICY", "RATE_LIMIT"] => {
                config.policy.rate_limit = parse_number(key, value)?;
            }
            ["POLICY", "MAINTENANCE_MODE"] => {
                config.policy.maintenance_mode = parse_bool(key, value)?;
            }
            ["POLICY", "BLOCKED_COUNTRIES"] => {
                config.policy.blocked_countries = split_list(value)
                    .into_iter()
                    .map(|c| c.to_uppercase())
                    .collect();
            }
            ["POLICY", "DEFAULT_COUNTRY"] => {
                config.policy.default_country = value.trim().to_uppercase();
            }
            ["POLICY", "REQUEST_COOKIE_MAX_AGE_SECS"] => {
                config.policy.request_cookie_max_age_secs = parse_number(key, value)?;
            }

            // Routes section
            ["ROUTES", "PUBLIC"] => config.routes.public = split_list(value),
            ["ROUTES", "AUTH"] => config.routes.auth = split_list(value),
            ["ROUTES", "PROTECTED"] => config.routes.protected = split_list(value),
            ["ROUTES", "ADMIN"] => config.routes.admin = split_list(value),
            ["ROUTES", "GEO_RESTRICTED"] => config.routes.geo_restricted = split_list(value),

            // Telemetry section
            ["TELEMETRY", "SERVICE_NAME"] => {
                config.telemetry.service_name = value.to_string();
            }
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = parse_bool(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                config.telemetry.logging.enabled = parse_bool(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => {
                config.telemetry.logging.level = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "LOGGING", "ANSI_ENABLED"] => {
                config.telemetry.logging.ansi_enabled = parse_bool(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                config.telemetry.logging.include_location = parse_bool(key, value)?;
            }

            _ => {
                tracing::debug!(var = key, "Ignoring unknown configuration variable");
            }
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env(key, "expected integer"))
}

/// Parse a boolean from a string.
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env(key, "expected boolean")),
    }
}

/// Overlays `overlay` onto `base`, recursing into objects.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Split a comma-separated list, dropping empty entries.
fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

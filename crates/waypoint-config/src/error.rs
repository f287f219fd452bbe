//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a configuration cannot be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file passed to [`ConfigLoader::with_file`](crate::ConfigLoader::with_file) does not exist.
    #[error("configuration file not found: {}", .path.display())]
    Missing {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read {}", .path.display())]
    Read {
        /// Requested path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is neither `.toml` nor `.json`.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// Malformed TOML, or an unknown field in a TOML file.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or an unknown field in a JSON file.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A `.env` file exists but could not be parsed.
    #[error("invalid .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// A `WAYPOINT__*` override has an unknown key or an unparsable value.
    #[error("{var}: {reason}")]
    Env {
        /// Variable name.
        var: String,
        /// What was expected.
        reason: String,
    },

    /// A loaded value breaks a policy or server constraint.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted field path, e.g. `policy.rate_limit`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn env(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_culprit() {
        let missing = ConfigError::Missing {
            path: PathBuf::from("/etc/waypoint/waypoint.toml"),
        };
        assert!(missing.to_string().contains("/etc/waypoint/waypoint.toml"));

        let invalid = ConfigError::invalid("policy.rate_limit", "must be greater than zero");
        assert_eq!(
            invalid.to_string(),
            "invalid value for policy.rate_limit: must be greater than zero"
        );

        let env = ConfigError::env("WAYPOINT__POLICY__RATE_LIMIT", "expected integer");
        assert_eq!(env.to_string(), "WAYPOINT__POLICY__RATE_LIMIT: expected integer");
    }
}

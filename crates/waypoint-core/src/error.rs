//! Error types for Waypoint.
//!
//! Failures that reach a caller are reported with a uniform envelope:
//!
//! ```json
//! { "success": false, "error": "title, body and userId are required" }
//! ```
//!
//! The HTTP status depends on the [`ErrorCategory`]: 404 for a missing
//! resource, 400 for missing required fields, 500 for everything else.
//! Nothing is retried.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Categories of caller-visible failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Transport failure talking to a collaborator.
    Network,
    /// Resource not found.
    NotFound,
    /// Missing or malformed input.
    Validation,
    /// Anything else.
    Server,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Network | Self::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A caller-visible failure.
///
/// # Example
///
/// ```
/// use waypoint_core::ApiError;
///
/// let err = ApiError::missing_fields(&["path"]);
/// assert_eq!(err.status_code().as_u16(), 400);
/// assert_eq!(err.envelope().error, "path is required");
/// ```
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure.
    #[error("{message}")]
    Network {
        /// Human-readable message.
        message: String,
    },

    /// Resource not found.
    #[error("{message}")]
    NotFound {
        /// Human-readable message.
        message: String,
    },

    /// Missing required fields or malformed input.
    #[error("{message}")]
    Validation {
        /// Human-readable message.
        message: String,
        /// Offending fields, if known.
        fields: Vec<String>,
    },

    /// Any other failure.
    #[error("{message}")]
    Server {
        /// Human-readable message.
        message: String,
    },
}

impl ApiError {
    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Creates a validation error naming the missing required fields.
    #[must_use]
    pub fn missing_fields(fields: &[&str]) -> Self {
        let verb = if fields.len() == 1 { "is" } else { "are" };
        let list = match fields {
            [] => "required fields".to_string(),
            [only] => (*only).to_string(),
            [init @ .., last] => format!("{} and {last}", init.join(", ")),
        };
        Self::Validation {
            message: format!("{list} {verb} required"),
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    /// Creates a server error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } => ErrorCategory::Network,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Server { .. } => ErrorCategory::Server,
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().status_code()
    }

    /// Converts the error into the response envelope.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation(format!("invalid JSON body: {err}"))
    }
}

/// The `{success: false, error}` failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false.
    pub success: bool,
    /// Human-readable message.
    pub error: String,
}

impl ErrorEnvelope {
    /// Creates a failure envelope.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

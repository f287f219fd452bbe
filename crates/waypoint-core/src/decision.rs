//! Decision records.
//!
//! Every policy stage that acts on a request appends one or more
//! [`DecisionRecord`]s. A pipeline pass produces an ordered sequence of
//! records terminated either by a terminal outcome or by the final
//! resolution record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The pipeline stage that produced a record.
///
/// Variants are declared in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Stage 1: request counter check.
    RateLimit,
    /// Stage 2: maintenance rewrite.
    Maintenance,
    /// Stage 3: geo-restricted content.
    Geolocation,
    /// Stage 4: public routes.
    PublicRoutes,
    /// Stage 5: login/register pages.
    AuthRoutes,
    /// Stage 6: routes requiring authentication.
    ProtectedRoutes,
    /// Stage 7: routes requiring the admin role.
    AdminRoutes,
    /// Stage 8: security headers.
    SecurityHeaders,
    /// Stage 9: final resolution summary.
    Response,
}

impl StageName {
    /// Returns the snake_case identifier used in metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Maintenance => "maintenance",
            Self::Geolocation => "geolocation",
            Self::PublicRoutes => "public_routes",
            Self::AuthRoutes => "auth_routes",
            Self::ProtectedRoutes => "protected_routes",
            Self::AdminRoutes => "admin_routes",
            Self::SecurityHeaders => "security_headers",
            Self::Response => "response",
        }
    }

    /// Returns the human-readable name shown in logs and exports.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::RateLimit => "Rate Limiting",
            Self::Maintenance => "Maintenance Mode",
            Self::Geolocation => "Geolocation",
            Self::PublicRoutes => "Public Routes",
            Self::AuthRoutes => "Auth Routes",
            Self::ProtectedRoutes => "Protected Routes",
            Self::AdminRoutes => "Admin Routes",
            Self::SecurityHeaders => "Security Headers",
            Self::Response => "Response",
        }
    }

    /// Returns all stages in pipeline order.
    #[must_use]
    pub const fn all() -> [StageName; 9] {
        [
            Self::RateLimit,
            Self::Maintenance,
            Self::Geolocation,
            Self::PublicRoutes,
            Self::AuthRoutes,
            Self::ProtectedRoutes,
            Self::AdminRoutes,
            Self::SecurityHeaders,
            Self::Response,
        ]
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The action a stage took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Pass to the next stage.
    Continue,
    /// Reject the request; nothing else runs.
    Block,
    /// Send the caller elsewhere.
    Redirect,
    /// Serve a different path under the same URL.
    Rewrite,
    /// Security headers were attached.
    AddHeaders,
}

impl Outcome {
    /// Returns the kebab-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Block => "block",
            Self::Redirect => "redirect",
            Self::Rewrite => "rewrite",
            Self::AddHeaders => "add-headers",
        }
    }

    /// Returns true for block, redirect and rewrite.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Block | Self::Redirect | Self::Rewrite)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a record, used for colouring and log statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// The request was refused or redirected for lack of access.
    Error,
    /// The request was diverted.
    Warning,
    /// The check passed.
    Success,
    /// Informational note.
    Info,
}

/// One entry in the decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Record identifier.
    pub id: Uuid,
    /// Stage that produced the record.
    pub stage: StageName,
    /// Severity.
    pub level: Level,
    /// Display glyph.
    pub icon: String,
    /// What the stage did. Informational records carry no outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// HTTP status associated with the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Path before a redirect or rewrite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    /// Path after a redirect or rewrite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
    /// Human-readable summary.
    pub message: String,
    /// Optional detail line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Set on the final resolution record.
    #[serde(default)]
    pub is_final: bool,
}

impl DecisionRecord {
    /// Creates a record stamped with the current time.
    ///
    /// # Example
    ///
    /// ```
    /// use waypoint_core::{DecisionRecord, Level, Outcome, StageName};
    ///
    /// let record = DecisionRecord::new(StageName::RateLimit, Level::Error, "🚫", "Blocked")
    ///     .with_outcome(Outcome::Block)
    ///     .with_status(429);
    ///
    /// assert_eq!(record.outcome, Some(Outcome::Block));
    /// assert_eq!(record.status_code, Some(429));
    /// ```
    #[must_use]
    pub fn new(
        stage: StageName,
        level: Level,
        icon: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            stage,
            level,
            icon: icon.into(),
            outcome: None,
            status_code: None,
            original_path: None,
            target_path: None,
            message: message.into(),
            details: None,
            timestamp: Utc::now(),
            is_final: false,
        }
    }

    /// Attaches a detail line.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Sets the outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Records the path change of a redirect or rewrite.
    #[must_use]
    pub fn with_route_change(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.original_path = Some(from.into());
        self.target_path = Some(to.into());
        self
    }

    /// Records only the target path.
    #[must_use]
    pub fn with_target(mut self, to: impl Into<String>) -> Self {
        self.target_path = Some(to.into());
        self
    }

    /// Marks this as the final resolution record.
    #[must_use]
    pub fn finalize(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Returns true if the record's outcome ends categorical evaluation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some_and(Outcome::is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let all = StageName::all();
        assert!(all.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(all[0], StageName::RateLimit);
        assert_eq!(all[8], StageName::Response);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(StageName::RateLimit.display_name(), "Rate Limiting");
        assert_eq!(StageName::AdminRoutes.as_str(), "admin_routes");
        assert_eq!(StageName::Response.to_string(), "Response");
    }

    #[test]
    fn test_outcome_terminal() {
        assert!(Outcome::Block.is_terminal());
        assert!(Outcome::Redirect.is_terminal());
        assert!(Outcome::Rewrite.is_terminal());
        assert!(!Outcome::Continue.is_terminal());
        assert!(!Outcome::AddHeaders.is_terminal());
    }

    #[test]
    fn test_outcome_serde() {
        assert_eq!(
            serde_json::to_string(&Outcome::AddHeaders).unwrap(),
            r#""add-headers""#
        );
    }

    #[test]
    fn test_record_builder() {
        let record = DecisionRecord::new(StageName::AuthRoutes, Level::Info, "↪️", "Already signed in")
            .with_outcome(Outcome::Redirect)
            .with_status(307)
            .with_route_change("/login", "/dashboard")
            .with_details("Sent to the dashboard");

        assert!(record.is_terminal());
        assert_eq!(record.original_path.as_deref(), Some("/login"));
        assert_eq!(record.target_path.as_deref(), Some("/dashboard"));
        assert!(!record.is_final);
        assert!(record.clone().finalize().is_final);
    }

    #[test]
    fn test_record_serialization_skips_empty() {
        let record = DecisionRecord::new(StageName::Maintenance, Level::Info, "👑", "Bypass");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("outcome").is_none());
        assert!(json.get("details").is_none());
        assert_eq!(json["stage"], "maintenance");
    }
}

//! Request context types.
//!
//! The [`RequestContext`] is the unit passed through the policy pipeline. It
//! describes one request (path, credentials, role, country) together with the
//! session-level inputs the pipeline needs (request counter, maintenance flag).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for each pipeline evaluation, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps evaluations sortable in exported logs.
///
/// # Example
///
/// ```
/// use waypoint_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Evaluation: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The role a caller holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Not signed in, or signed in without a role.
    #[default]
    Guest,
    /// Regular signed-in user.
    User,
    /// Administrator.
    Admin,
}

impl Role {
    /// Returns the lowercase name used in cookies and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parses a role cookie value, falling back to [`Role::Guest`].
    ///
    /// ```
    /// use waypoint_core::Role;
    ///
    /// assert_eq!(Role::from_cookie("admin"), Role::Admin);
    /// assert_eq!(Role::from_cookie("root"), Role::Guest);
    /// ```
    #[must_use]
    pub fn from_cookie(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// Returns true for [`Role::Admin`].
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Quick-setup presets for the caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Unauthenticated guest.
    Anonymous,
    /// Authenticated regular user.
    User,
    /// Authenticated administrator.
    Admin,
}

impl Preset {
    /// Returns `(is_authenticated, role)` for this preset.
    #[must_use]
    pub const fn identity(self) -> (bool, Role) {
        match self {
            Self::Anonymous => (false, Role::Guest),
            Self::User => (true, Role::User),
            Self::Admin => (true, Role::Admin),
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anonymous" => Ok(Self::Anonymous),
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown preset: {other}")),
        }
    }
}

/// The description of one request as seen by the policy pipeline.
///
/// A context is immutable during a pipeline pass. The request counter is the
/// value observed *before* the pass; the pipeline reports the incremented
/// value separately.
///
/// # Example
///
/// ```
/// use waypoint_core::{RequestContext, Role};
///
/// let ctx = RequestContext::new("/dashboard")
///     .authenticated(Role::User)
///     .with_country("FR");
///
/// assert!(ctx.is_authenticated);
/// assert_eq!(ctx.role, Role::User);
/// assert_eq!(ctx.country, "FR");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// The route being evaluated.
    pub path: String,
    /// Whether the caller presented credentials.
    pub is_authenticated: bool,
    /// Caller role.
    pub role: Role,
    /// ISO 3166-1 alpha-2 country code, uppercase.
    pub country: String,
    /// Requests already counted for this caller.
    pub request_count: u32,
    /// Process-wide maintenance toggle.
    pub maintenance_mode: bool,
}

impl RequestContext {
    /// Creates an anonymous guest context for `path` with country `US`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_authenticated: false,
            role: Role::Guest,
            country: crate::geo::DEFAULT_COUNTRY.to_string(),
            request_count: 0,
            maintenance_mode: false,
        }
    }

    /// Marks the caller as authenticated with the given role.
    #[must_use]
    pub fn authenticated(mut self, role: Role) -> Self {
        self.is_authenticated = true;
        self.role = role;
        self
    }

    /// Sets the caller role without changing the authentication flag.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets the caller country; the code is normalised to uppercase.
    #[must_use]
    pub fn with_country(mut self, country: impl AsRef<str>) -> Self {
        self.country = country.as_ref().trim().to_ascii_uppercase();
        self
    }

    /// Sets the observed request counter.
    #[must_use]
    pub fn with_request_count(mut self, count: u32) -> Self {
        self.request_count = count;
        self
    }

    /// Sets the maintenance toggle.
    #[must_use]
    pub fn with_maintenance(mut self, enabled: bool) -> Self {
        self.maintenance_mode = enabled;
        self
    }

    /// Applies a quick-setup preset to the identity fields.
    #[must_use]
    pub fn with_preset(mut self, preset: Preset) -> Self {
        let (authenticated, role) = preset.identity();
        self.is_authenticated = authenticated;
        self.role = role;
        self
    }
}

//! Health endpoint.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Body of `GET /_waypoint/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always `healthy` while the process is serving.
    pub status: String,
    /// Service name from configuration.
    pub service: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the server was created.
    pub uptime_seconds: u64,
    /// Whether the maintenance toggle is on.
    pub maintenance_mode: bool,
}

/// Liveness reporter.
///
/// ```
/// use waypoint_server::HealthCheck;
///
/// let health = HealthCheck::new("waypoint", "0.1.0");
/// let status = health.status(false);
///
/// assert_eq!(status.status, "healthy");
/// assert_eq!(status.service, "waypoint");
/// ```
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    started_at: Instant,
}

impl HealthCheck {
    /// Creates a reporter; uptime counts from now.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            started_at: Instant::now(),
        }
    }

    /// Returns the time since creation.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Builds the current status.
    #[must_use]
    pub fn status(&self, maintenance_mode: bool) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            service: self.service.clone(),
            version: self.version.clone(),
            uptime_seconds: self.uptime().as_secs(),
            maintenance_mode,
        }
    }
}

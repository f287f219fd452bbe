//! Typed configuration for Waypoint.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration: preset, then a file merged over it, then env
//!
//! # Example
//!
//! ```no_run
//! use waypoint_config::ConfigLoader;
//!
//! # fn main() -> Result<(), waypoint_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_development()
//!     .with_file("waypoint.toml")?
//!     .with_env_prefix("WAYPOINT")
//!     .with_legacy_env()
//!     .load()?;
//!
//! println!("Listening on: {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:3000"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//!
//! [policy]
//! rate_limit = 10
//! maintenance_mode = false
//! blocked_countries = ["CN", "KP"]
//! default_country = "US"
//! request_cookie_max_age_secs = 3600
//!
//! [routes]
//! public = ["/", "/about"]
//! auth = ["/login", "/register"]
//! protected = ["/dashboard", "/profile", "/settings"]
//! admin = ["/admin", "/admin/users", "/admin/settings"]
//! geo_restricted = ["/premium", "/exclusive"]
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables, e.g.
//! `WAYPOINT__POLICY__RATE_LIMIT=20`. List values are comma-separated.

#![doc(html_root_url = "https://docs.rs/waypoint-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::WaypointConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, LEGACY_MAINTENANCE_VAR};
pub use schema::*;

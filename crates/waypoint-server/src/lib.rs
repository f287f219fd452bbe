//! # Waypoint Server
//!
//! HTTP front end for the Waypoint request policy pipeline.
//!
//! - `/_waypoint/*` is the control API: simulate requests, switch presets
//!   and maintenance mode, read or export the decision log, scrape metrics
//! - every other path runs through the live policy middleware and is then
//!   answered by a placeholder page
//!
//! The `waypoint` binary loads configuration, installs telemetry and runs
//! a [`Server`] until SIGTERM or SIGINT.

#![doc(html_root_url = "https://docs.rs/waypoint-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod control;
pub mod error;
pub mod health;
pub mod pages;
pub mod server;
pub mod shutdown;

pub use control::ControlApi;
pub use error::{ServerError, ServerResult};
pub use health::{HealthCheck, HealthStatus};
pub use server::Server;
pub use shutdown::ShutdownSignal;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # Waypoint Core
//!
//! Core types for the Waypoint request policy pipeline.
//!
//! This crate provides the foundational types used throughout Waypoint:
//!
//! - [`RequestContext`] - The per-pass description of a simulated request
//! - [`RequestId`] - UUID v7 identifier for one pipeline evaluation
//! - [`Role`] - Caller role (guest, user, admin)
//! - [`DecisionRecord`] - The log entry a policy stage produces
//! - [`RouteTable`] - Static classification of paths into route categories
//! - [`ApiError`] - The `{success: false, error}` failure envelope

#![doc(html_root_url = "https://docs.rs/waypoint-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod decision;
mod error;
pub mod geo;
pub mod headers;
mod route;

pub use context::{Preset, RequestContext, RequestId, Role};
pub use decision::{DecisionRecord, Level, Outcome, StageName};
pub use error::{ApiError, ApiResult, ErrorCategory, ErrorEnvelope};
pub use headers::SecurityHeader;
pub use route::{DemoRoute, RouteCategory, RouteTable};

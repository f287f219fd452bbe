//! # Waypoint Middleware
//!
//! The request policy pipeline and the HTTP middleware that enforces it.
//!
//! ## Policy Pipeline
//!
//! ```text
//! RateLimit → Maintenance → Geolocation → Public → Auth → Protected → Admin
//!                                                                       ↓
//!                                       Response ← SecurityHeaders ←────┘
//! ```
//!
//! A rate-limit block stops the pass at once. A redirect or rewrite skips
//! the remaining access checks but still runs the security headers and the
//! response stage. See [`pipeline`] for the full stage table.
//!
//! ## Layers
//!
//! - [`PolicyPipeline`] evaluates one [`RequestContext`](waypoint_core::RequestContext)
//!   and holds no mutable state
//! - [`Session`] owns the counter, the maintenance toggle and the decision log
//! - [`PolicyMiddleware`] applies an evaluation to a live HTTP request inside
//!   a [`MiddlewareChain`]
//!
//! ## Example
//!
//! ```
//! use waypoint_core::{Outcome, StageName};
//! use waypoint_middleware::{PolicyPipeline, Session, SimulatedRequest};
//!
//! let session = Session::new(PolicyPipeline::default());
//! session.set_maintenance(true);
//!
//! let evaluation = session.simulate(SimulatedRequest::new("/dashboard")).unwrap();
//! assert_eq!(evaluation.final_path, "/maintenance");
//! assert_eq!(evaluation.status_code, 503);
//! assert_eq!(evaluation.terminal, Some(Outcome::Rewrite));
//! assert_eq!(evaluation.records_for(StageName::ProtectedRoutes).count(), 0);
//! ```

#![doc(html_root_url = "https://docs.rs/waypoint-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod context;
pub mod live;
pub mod middleware;
pub mod pipeline;
pub mod session;
pub mod stages;
pub mod types;

pub use chain::{MiddlewareChain, MiddlewareChainBuilder, RequestIdMiddleware};
pub use context::MiddlewareContext;
pub use live::PolicyMiddleware;
pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{Evaluation, PolicyPipeline, PolicySettings};
pub use session::{Session, SessionSnapshot, SimulatedRequest};
pub use stages::{PassState, PolicyStage};
pub use types::{Request, Response, ResponseExt};

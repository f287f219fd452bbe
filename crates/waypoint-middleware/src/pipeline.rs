//! Fixed-order policy pipeline.
//!
//! The pipeline evaluates a [`RequestContext`] against the policy stages in
//! a fixed order and returns an [`Evaluation`]. It holds no mutable state:
//! counters and the decision log live in a [`Session`](crate::Session).
//!
//! ## Stage Order
//!
//! | # | Stage | Terminal outcome |
//! |---|-------|------------------|
//! | 1 | Rate Limiting | block 429 |
//! | 2 | Maintenance Mode | rewrite `/maintenance` 503 |
//! | 3 | Geolocation | redirect `/geo-restricted` 451 |
//! | 4 | Public Routes | - |
//! | 5 | Auth Routes | redirect `/dashboard` 307 |
//! | 6 | Protected Routes | redirect `/login?redirect=<path>` 401 |
//! | 7 | Admin Routes | redirect `/login` 401 or `/403-forbidden` 403 |
//! | 8 | Security Headers | - |
//! | 9 | Response | - |

use crate::stages::{
    AdminRoutesStage, AuthRoutesStage, GeolocationStage, MaintenanceStage, PassState, PolicyStage,
    ProtectedRoutesStage, PublicRoutesStage, RateLimitStage, ResolutionStage,
    SecurityHeadersStage,
};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use waypoint_core::geo::DEFAULT_BLOCKED_COUNTRIES;
use waypoint_core::{
    DecisionRecord, Outcome, RequestContext, RequestId, RouteTable, SecurityHeader, StageName,
};
use waypoint_telemetry::metrics;

/// A type-erased policy stage.
pub type BoxedStage = Box<dyn PolicyStage>;

/// Tunable policy values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySettings {
    /// Requests allowed before blocking.
    pub rate_limit: u32,
    /// Countries refused access to geo-restricted routes.
    pub blocked_countries: Vec<String>,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            rate_limit: crate::stages::rate_limit::DEFAULT_RATE_LIMIT,
            blocked_countries: DEFAULT_BLOCKED_COUNTRIES
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
        }
    }
}

/// Result of one pipeline pass.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// Identifier of this pass.
    pub request_id: RequestId,
    /// The evaluated context.
    pub context: RequestContext,
    /// Records in production order.
    pub records: Vec<DecisionRecord>,
    /// Path the request resolves to.
    pub final_path: String,
    /// Status the request resolves to.
    pub status_code: u16,
    /// The rate limiter refused the request.
    pub blocked: bool,
    /// A stage redirected or rewrote the request.
    pub redirected: bool,
    /// The terminal outcome, if any.
    pub terminal: Option<Outcome>,
    /// Security headers to apply.
    pub headers: Vec<SecurityHeader>,
    /// Counter value after this pass.
    pub request_count_after: u32,
    /// Wall time spent evaluating.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl Evaluation {
    /// Returns the records produced by `stage`.
    pub fn records_for(&self, stage: StageName) -> impl Iterator<Item = &DecisionRecord> {
        self.records.iter().filter(move |r| r.stage == stage)
    }

    /// Returns true if the request was rewritten rather than redirected.
    #[must_use]
    pub fn is_rewrite(&self) -> bool {
        self.terminal == Some(Outcome::Rewrite)
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

/// The fixed-order policy pipeline.
///
/// # Example
///
/// ```
/// use waypoint_core::{RequestContext, RouteTable};
/// use waypoint_middleware::{PolicyPipeline, PolicySettings};
///
/// let pipeline = PolicyPipeline::new(RouteTable::default(), PolicySettings::default());
/// let evaluation = pipeline.evaluate(&RequestContext::new("/dashboard"));
///
/// assert_eq!(evaluation.final_path, "/login?redirect=/dashboard");
/// assert_eq!(evaluation.status_code, 401);
/// assert_eq!(evaluation.request_count_after, 1);
/// ```
pub struct PolicyPipeline {
    stages: Vec<BoxedStage>,
    routes: Arc<RouteTable>,
    settings: PolicySettings,
}

impl std::fmt::Debug for PolicyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyPipeline")
            .field("stages", &self.stage_names())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PolicyPipeline {
    /// Builds the pipeline with every stage in its fixed position.
    #[must_use]
    pub fn new(routes: RouteTable, settings: PolicySettings) -> Self {
        let routes = Arc::new(routes);
        let stages: Vec<BoxedStage> = vec![
            Box::new(RateLimitStage::new(settings.rate_limit)),
            Box::new(MaintenanceStage),
            Box::new(
                GeolocationStage::new(Arc::clone(&routes))
                    .with_blocked_countries(settings.blocked_countries.iter().cloned()),
            ),
            Box::new(PublicRoutesStage::new(Arc::clone(&routes))),
            Box::new(AuthRoutesStage::new(Arc::clone(&routes))),
            Box::new(ProtectedRoutesStage::new(Arc::clone(&routes))),
            Box::new(AdminRoutesStage::new(Arc::clone(&routes))),
            Box::new(SecurityHeadersStage),
            Box::new(ResolutionStage),
        ];

        Self {
            stages,
            routes,
            settings,
        }
    }

    /// Returns the route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns the policy settings.
    #[must_use]
    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }

    /// Returns the stage names in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Evaluates `ctx` against every stage.
    ///
    /// A block stops the pass. A redirect or rewrite skips the remaining
    /// route stages; headers and the final record still run.
    #[must_use]
    pub fn evaluate(&self, ctx: &RequestContext) -> Evaluation {
        let request_id = RequestId::new();
        tracing::debug!(
            request_id = %request_id,
            path = %ctx.path,
            authenticated = ctx.is_authenticated,
            role = %ctx.role,
            country = %ctx.country,
            request_count = ctx.request_count,
            "Request received"
        );

        let mut pass = PassState::new(ctx);
        for stage in &self.stages {
            if pass.is_blocked() {
                break;
            }
            if pass.is_redirected() && !stage.runs_after_diversion() {
                continue;
            }
            stage.evaluate(ctx, &mut pass);
        }

        let elapsed = pass.started_at().elapsed();
        let parts = pass.into_parts();

        for record in &parts.records {
            metrics::record_decision(record);
        }
        metrics::record_evaluation(parts.status_code, elapsed);

        if parts.blocked {
            tracing::warn!(
                request_id = %request_id,
                path = %ctx.path,
                status = parts.status_code,
                "Request blocked"
            );
        } else {
            tracing::info!(
                request_id = %request_id,
                path = %ctx.path,
                final_path = %parts.final_path,
                status = parts.status_code,
                duration_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                "Request resolved"
            );
        }

        Evaluation {
            request_id,
            context: ctx.clone(),
            records: parts.records,
            final_path: parts.final_path,
            status_code: parts.status_code,
            blocked: parts.blocked,
            redirected: parts.redirected,
            terminal: parts.terminal,
            headers: parts.headers,
            request_count_after: parts.request_count_after,
            elapsed,
        }
    }
}

impl Default for PolicyPipeline {
    fn default() -> Self {
        Self::new(RouteTable::default(), PolicySettings::default())
    }
}

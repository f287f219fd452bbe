//! Pipeline sessions.
//!
//! A [`Session`] owns the state that outlives a single pipeline pass: the
//! request counter, the maintenance toggle, the caller identity chosen by a
//! preset and the decision log. All of it sits behind one lock, so reading
//! the counter, evaluating, bumping the counter and appending the records
//! happen as one step.

use crate::pipeline::{Evaluation, PolicyPipeline};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waypoint_core::geo::DEFAULT_COUNTRY;
use waypoint_core::{ApiError, ApiResult, DecisionRecord, Preset, RequestContext, Role};
use waypoint_telemetry::{LogStats, TelemetrySink};

/// A request submitted to the simulator.
///
/// Unset identity fields fall back to the session identity. A preset
/// overrides both identity fields for this request only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatedRequest {
    /// Route to evaluate.
    #[serde(default)]
    pub path: String,
    /// Whether the caller is signed in.
    #[serde(default)]
    pub is_authenticated: Option<bool>,
    /// Caller role.
    #[serde(default)]
    pub role: Option<Role>,
    /// Caller country.
    #[serde(default)]
    pub country: Option<String>,
    /// Identity preset.
    #[serde(default)]
    pub preset: Option<Preset>,
}

impl SimulatedRequest {
    /// Creates a request for `path` using the session identity.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> ApiResult<()> {
        let path = self.path.trim();
        if path.is_empty() {
            return Err(ApiError::missing_fields(&["path"]));
        }
        if !path.starts_with('/') {
            return Err(ApiError::validation(format!("path must start with '/': {path}")));
        }
        Ok(())
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Requests counted so far.
    pub request_count: u32,
    /// Requests allowed before blocking.
    pub rate_limit: u32,
    /// Share of the limit used, 0 to 100.
    pub usage_percent: f64,
    /// Maintenance toggle.
    pub maintenance_mode: bool,
    /// Session identity: signed in.
    pub is_authenticated: bool,
    /// Session identity: role.
    pub role: Role,
    /// Session identity: country.
    pub country: String,
    /// Decision log counts.
    pub stats: LogStats,
    /// Duration of the latest non-blocked pass in milliseconds.
    pub last_execution_ms: Option<f64>,
}

#[derive(Debug)]
struct SessionState {
    request_count: u32,
    maintenance_mode: bool,
    is_authenticated: bool,
    role: Role,
    country: String,
    sink: TelemetrySink,
}

/// Session-scoped pipeline state.
///
/// # Example
///
/// ```
/// use waypoint_middleware::{PolicyPipeline, Session, SimulatedRequest};
///
/// let session = Session::new(PolicyPipeline::default());
/// let evaluation = session.simulate(SimulatedRequest::new("/about")).unwrap();
///
/// assert_eq!(evaluation.status_code, 200);
/// assert_eq!(session.snapshot().request_count, 1);
/// ```
#[derive(Debug)]
pub struct Session {
    pipeline: Arc<PolicyPipeline>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Creates a session with an anonymous identity and an empty log.
    #[must_use]
    pub fn new(pipeline: PolicyPipeline) -> Self {
        Self::with_shared_pipeline(Arc::new(pipeline))
    }

    /// Creates a session around an already shared pipeline.
    #[must_use]
    pub fn with_shared_pipeline(pipeline: Arc<PolicyPipeline>) -> Self {
        Self {
            pipeline,
            state: Mutex::new(SessionState {
                request_count: 0,
                maintenance_mode: false,
                is_authenticated: false,
                role: Role::Guest,
                country: DEFAULT_COUNTRY.to_string(),
                sink: TelemetrySink::new(),
            }),
        }
    }

    /// Sets the initial maintenance toggle.
    #[must_use]
    pub fn with_maintenance(self, enabled: bool) -> Self {
        self.state.lock().maintenance_mode = enabled;
        self
    }

    /// Sets the session country.
    #[must_use]
    pub fn with_country(self, country: impl AsRef<str>) -> Self {
        self.state.lock().country = country.as_ref().trim().to_ascii_uppercase();
        self
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &PolicyPipeline {
        &self.pipeline
    }

    /// Evaluates a simulated request and appends its records to the log.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the path is empty or relative.
    pub fn simulate(&self, request: SimulatedRequest) -> ApiResult<Evaluation> {
        request.validate()?;

        let mut state = self.state.lock();
        let (is_authenticated, role) = request.preset.map_or_else(
            || {
                (
                    request.is_authenticated.unwrap_or(state.is_authenticated),
                    request.role.unwrap_or(state.role),
                )
            },
            Preset::identity,
        );

        let mut ctx = RequestContext::new(request.path.trim())
            .with_country(request.country.as_deref().unwrap_or(&state.country))
            .with_request_count(state.request_count)
            .with_maintenance(state.maintenance_mode);
        ctx.is_authenticated = is_authenticated;
        ctx.role = role;

        let evaluation = self.pipeline.evaluate(&ctx);
        state.request_count = evaluation.request_count_after;
        Self::append(&mut state, &evaluation);

        Ok(evaluation)
    }

    /// Evaluates a context built from a live HTTP request.
    ///
    /// The caller's counter travels with the request, so the session counter
    /// is left alone; the maintenance toggle is the session's.
    pub fn evaluate_live(&self, ctx: RequestContext) -> Evaluation {
        let mut state = self.state.lock();
        let ctx = ctx.with_maintenance(state.maintenance_mode);
        let evaluation = self.pipeline.evaluate(&ctx);
        Self::append(&mut state, &evaluation);
        evaluation
    }

    fn append(state: &mut SessionState, evaluation: &Evaluation) {
        state.sink.extend(evaluation.records.iter().cloned());
        if !evaluation.blocked {
            state.sink.set_last_execution(evaluation.elapsed);
        }
    }

    /// Switches maintenance mode on or off.
    pub fn set_maintenance(&self, enabled: bool) {
        self.state.lock().maintenance_mode = enabled;
        tracing::info!(enabled, "Maintenance mode changed");
    }

    /// Returns the maintenance toggle.
    #[must_use]
    pub fn maintenance_mode(&self) -> bool {
        self.state.lock().maintenance_mode
    }

    /// Applies an identity preset and clears the log.
    pub fn apply_preset(&self, preset: Preset) {
        let (is_authenticated, role) = preset.identity();
        let mut state = self.state.lock();
        state.is_authenticated = is_authenticated;
        state.role = role;
        state.sink.clear();
        tracing::debug!(?preset, "Preset applied");
    }

    /// Empties the log. The request counter is kept.
    pub fn clear_log(&self) {
        self.state.lock().sink.clear();
    }

    /// Empties the log and resets the request counter to zero.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.sink.clear();
        state.request_count = 0;
        tracing::info!("Session reset");
    }

    /// Returns a copy of the log.
    #[must_use]
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.state.lock().sink.records().to_vec()
    }

    /// Returns the log as plain text.
    #[must_use]
    pub fn export(&self) -> String {
        self.state.lock().sink.export()
    }

    /// Returns the current counters, identity and log stats.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        let rate_limit = self.pipeline.settings().rate_limit;
        let usage_percent = if rate_limit == 0 {
            100.0
        } else {
            (f64::from(state.request_count) / f64::from(rate_limit) * 100.0).min(100.0)
        };

        SessionSnapshot {
            request_count: state.request_count,
            rate_limit,
            usage_percent,
            maintenance_mode: state.maintenance_mode,
            is_authenticated: state.is_authenticated,
            role: state.role,
            country: state.country.clone(),
            stats: state.sink.stats(),
            last_execution_ms: state
                .sink
                .last_execution()
                .map(|d| d.as_secs_f64() * 1000.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::ErrorCategory;

    fn session() -> Session {
        Session::new(PolicyPipeline::default())
    }

    #[test]
    fn test_counter_increments_once_per_pass() {
        let session = session();
        session.simulate(SimulatedRequest::new("/")).unwrap();
        session.simulate(SimulatedRequest::new("/")).unwrap();
        assert_eq!(session.snapshot().request_count, 2);
    }

    #[test]
    fn test_blocked_after_limit() {
        let session = session();
        for _ in 0..10 {
            assert!(!session.simulate(SimulatedRequest::new("/")).unwrap().blocked);
        }

        let evaluation = session.simulate(SimulatedRequest::new("/")).unwrap();
        assert!(evaluation.blocked);
        assert_eq!(session.snapshot().request_count, 10);
        assert!((session.snapshot().usage_percent - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_log_grows_until_cleared() {
        let session = session();
        session.simulate(SimulatedRequest::new("/")).unwrap();
        let first = session.records().len();
        session.simulate(SimulatedRequest::new("/")).unwrap();
        assert_eq!(session.records().len(), first * 2);

        session.clear_log();
        assert!(session.records().is_empty());
        assert_eq!(session.snapshot().request_count, 2);
        assert!(session.snapshot().last_execution_ms.is_none());
    }

    #[test]
    fn test_reset_clears_counter() {
        let session = session();
        session.simulate(SimulatedRequest::new("/about")).unwrap();
        session.reset();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.request_count, 0);
        assert_eq!(snapshot.stats.total, 0);
    }

    #[test]
    fn test_preset_sets_identity_and_clears_log() {
        let session = session();
        session.simulate(SimulatedRequest::new("/")).unwrap();
        session.apply_preset(Preset::Admin);

        assert!(session.records().is_empty());
        let evaluation = session.simulate(SimulatedRequest::new("/admin")).unwrap();
        assert_eq!(evaluation.status_code, 200);
        assert!(evaluation.context.is_authenticated);
    }

    #[test]
    fn test_request_preset_is_one_shot() {
        let session = session();
        let request = SimulatedRequest {
            preset: Some(Preset::User),
            ..SimulatedRequest::new("/login")
        };
        assert_eq!(session.simulate(request).unwrap().status_code, 307);

        let evaluation = session.simulate(SimulatedRequest::new("/login")).unwrap();
        assert_eq!(evaluation.status_code, 200);
    }

    #[test]
    fn test_maintenance_toggle() {
        let session = session();
        session.set_maintenance(true);
        assert!(session.maintenance_mode());

        let evaluation = session.simulate(SimulatedRequest::new("/about")).unwrap();
        assert_eq!(evaluation.final_path, "/maintenance");
    }

    #[test]
    fn test_live_evaluation_keeps_session_counter() {
        let session = session().with_maintenance(true);
        let evaluation = session.evaluate_live(RequestContext::new("/").with_request_count(3));

        assert_eq!(evaluation.request_count_after, 4);
        assert!(evaluation.is_rewrite());
        assert_eq!(session.snapshot().request_count, 0);
        assert!(!session.records().is_empty());
    }

    #[test]
    fn test_invalid_paths() {
        let session = session();
        let err = session.simulate(SimulatedRequest::new("  ")).unwrap_err();
        assert_eq!(err.to_string(), "path is required");

        let err = session.simulate(SimulatedRequest::new("dashboard")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_export_matches_log() {
        let session = session().with_country("fr");
        session.simulate(SimulatedRequest::new("/premium")).unwrap();

        let export = session.export();
        assert!(export.contains("[Geolocation] 🌍 Geolocation detected: FR"));
        assert_eq!(export.split("\n\n").count(), session.records().len());
    }
}

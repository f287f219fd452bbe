//! Control API under `/_waypoint/`.
//!
//! | Method | Path | Effect |
//! |--------|------|--------|
//! | GET | `health` | liveness status |
//! | GET | `routes` | route table, demo catalogue, stage order |
//! | GET | `state` | session snapshot |
//! | POST | `simulate` | evaluate a [`SimulatedRequest`] |
//! | POST | `preset/<name>` | set the session identity, clear the log |
//! | PUT | `maintenance` | `{"enabled": bool}` |
//! | GET | `logs` | decision log and stats |
//! | GET | `logs/export` | plain-text log download |
//! | DELETE | `logs` | clear the log, keep the counter |
//! | POST | `reset` | clear the log and the counter |
//! | GET | `metrics` | Prometheus text format |
//!
//! Failures use the `{"success": false, "error": ...}` envelope.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use waypoint_core::{ApiError, ApiResult, DecisionRecord, DemoRoute, Preset, RouteCategory, RouteTable};
use waypoint_middleware::{Response, ResponseExt, Session, SimulatedRequest};
use waypoint_telemetry::{export_file_name, metrics, LogStats};

use crate::health::HealthCheck;

/// Path prefix of the control API.
pub const CONTROL_PREFIX: &str = "/_waypoint";

/// Returns the endpoint part of `path` if it lies in the control space.
///
/// Matches `/_waypoint` itself and anything below `/_waypoint/`, but not
/// siblings such as `/_waypointx`.
#[must_use]
pub fn control_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(CONTROL_PREFIX)?;
    (rest.is_empty() || rest.starts_with('/')).then(|| rest.trim_start_matches('/'))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaintenanceToggle {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct RoutesView<'a> {
    table: &'a RouteTable,
    catalogue: Vec<DemoRoute>,
    stages: Vec<&'static str>,
    overlaps: Vec<(String, Vec<RouteCategory>)>,
}

#[derive(Debug, Serialize)]
struct LogsView {
    records: Vec<DecisionRecord>,
    stats: LogStats,
}

/// Handlers for the control endpoints.
#[derive(Debug, Clone)]
pub struct ControlApi {
    session: Arc<Session>,
    health: HealthCheck,
}

impl ControlApi {
    /// Creates the API over a shared session.
    #[must_use]
    pub fn new(session: Arc<Session>, health: HealthCheck) -> Self {
        Self { session, health }
    }

    /// Handles `method` on `path`, where `path` has the control prefix removed.
    pub fn handle(&self, method: &Method, path: &str, body: &Bytes) -> Response {
        let path = path.trim_matches('/');
        tracing::debug!(method = %method, path, "Control request");

        match self.route(method, path, body) {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(error = %err, "Control request failed");
                Response::api_error(&err)
            }
        }
    }

    fn route(&self, method: &Method, path: &str, body: &Bytes) -> ApiResult<Response> {
        match (method.as_str(), path) {
            ("GET", "health") => Ok(Response::json(
                StatusCode::OK,
                &self.health.status(self.session.maintenance_mode()),
            )),
            ("GET", "routes") => Ok(self.routes()),
            ("GET", "state") => Ok(self.state()),
            ("POST", "simulate") => self.simulate(body),
            ("PUT", "maintenance") => {
                let toggle: MaintenanceToggle = parse_body(body)?
                    .ok_or_else(|| ApiError::missing_fields(&["enabled"]))?;
                self.session.set_maintenance(toggle.enabled);
                Ok(self.state())
            }
            ("GET", "logs") => Ok(Response::json(
                StatusCode::OK,
                &LogsView {
                    records: self.session.records(),
                    stats: self.session.snapshot().stats,
                },
            )),
            ("GET", "logs/export") => Ok(self.export()),
            ("DELETE", "logs") => {
                self.session.clear_log();
                Ok(self.state())
            }
            ("POST", "reset") => {
                self.session.reset();
                Ok(self.state())
            }
            ("GET", "metrics") => metrics::render_metrics()
                .map(|text| Response::text(StatusCode::OK, text))
                .ok_or_else(|| ApiError::not_found("metrics exporter is not installed")),
            ("POST", p) if p.starts_with("preset/") => {
                let name = &p["preset/".len()..];
                let preset: Preset = name.parse().map_err(ApiError::validation)?;
                self.session.apply_preset(preset);
                Ok(self.state())
            }
            (m, p) => Err(ApiError::not_found(format!(
                "no control endpoint for {m} {CONTROL_PREFIX}/{p}"
            ))),
        }
    }

    fn state(&self) -> Response {
        Response::json(StatusCode::OK, &self.session.snapshot())
    }

    fn routes(&self) -> Response {
        let pipeline = self.session.pipeline();
        let view = RoutesView {
            table: pipeline.routes(),
            catalogue: DemoRoute::catalogue(),
            stages: pipeline
                .stage_names()
                .into_iter()
                .map(|s| s.display_name())
                .collect(),
            overlaps: pipeline.routes().overlaps(),
        };
        Response::json(StatusCode::OK, &view)
    }

    fn simulate(&self, body: &Bytes) -> ApiResult<Response> {
        let request: SimulatedRequest = parse_body(body)?.unwrap_or_default();
        let evaluation = self.session.simulate(request)?;
        Ok(Response::json(StatusCode::OK, &evaluation))
    }

    fn export(&self) -> Response {
        let file_name = export_file_name(chrono::Utc::now().timestamp_millis());
        let mut response = Response::text(StatusCode::OK, self.session.export());
        if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\"")) {
            response.headers_mut().insert(CONTENT_DISPOSITION, value);
        }
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        response
    }
}

/// Parses a JSON body; an empty body yields `None`.
fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> ApiResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use waypoint_middleware::PolicyPipeline;

    fn api() -> ControlApi {
        ControlApi::new(
            Arc::new(Session::new(PolicyPipeline::default())),
            HealthCheck::new("waypoint", "test"),
        )
    }

    async fn json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_control_path() {
        assert_eq!(control_path("/_waypoint"), Some(""));
        assert_eq!(control_path("/_waypoint/"), Some(""));
        assert_eq!(control_path("/_waypoint/logs/export"), Some("logs/export"));
        assert_eq!(control_path("/_waypointx"), None);
        assert_eq!(control_path("/about"), None);
    }

    #[tokio::test]
    async fn test_simulate_and_state() {
        let api = api();
        let body = Bytes::from_static(br#"{"path": "/dashboard"}"#);
        let response = api.handle(&Method::POST, "simulate", &body);
        assert_eq!(response.status(), StatusCode::OK);

        let evaluation = json(response).await;
        assert_eq!(evaluation["final_path"], "/login?redirect=/dashboard");
        assert_eq!(evaluation["status_code"], 401);

        let state = json(api.handle(&Method::GET, "state", &Bytes::new())).await;
        assert_eq!(state["request_count"], 1);
    }

    #[tokio::test]
    async fn test_simulate_requires_path() {
        let response = api().handle(&Method::POST, "simulate", &Bytes::new());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let envelope = json(response).await;
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"], "path is required");
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let response = api().handle(&Method::POST, "simulate", &Bytes::from_static(b"{"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_preset_and_maintenance() {
        let api = api();
        let state = json(api.handle(&Method::POST, "preset/admin", &Bytes::new())).await;
        assert_eq!(state["role"], "admin");
        assert_eq!(state["is_authenticated"], true);

        let body = Bytes::from_static(br#"{"enabled": true}"#);
        let state = json(api.handle(&Method::PUT, "/maintenance/", &body)).await;
        assert_eq!(state["maintenance_mode"], true);

        let response = api.handle(&Method::POST, "preset/root", &Bytes::new());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_is_attachment() {
        let api = api();
        api.handle(&Method::POST, "simulate", &Bytes::from_static(br#"{"path": "/"}"#));

        let response = api.handle(&Method::GET, "logs/export", &Bytes::new());
        let disposition = response.headers().get(CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"middleware-logs-"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("[Rate Limiting]"));
        assert!(text.contains("\n\n"));
    }

    #[tokio::test]
    async fn test_clear_keeps_counter_reset_does_not() {
        let api = api();
        api.handle(&Method::POST, "simulate", &Bytes::from_static(br#"{"path": "/"}"#));

        let state = json(api.handle(&Method::DELETE, "logs", &Bytes::new())).await;
        assert_eq!(state["request_count"], 1);
        assert_eq!(state["stats"]["total"], 0);

        let state = json(api.handle(&Method::POST, "reset", &Bytes::new())).await;
        assert_eq!(state["request_count"], 0);
    }

    #[tokio::test]
    async fn test_unknown_endpoint() {
        let response = api().handle(&Method::GET, "nope", &Bytes::new());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_routes_view() {
        let view = json(api().handle(&Method::GET, "routes", &Bytes::new())).await;
        assert_eq!(view["stages"][0], "Rate Limiting");
        assert_eq!(view["catalogue"].as_array().unwrap().len(), 10);
        assert!(view["overlaps"].as_array().unwrap().is_empty());
    }
}

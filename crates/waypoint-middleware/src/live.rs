//! Policy enforcement on live HTTP traffic.
//!
//! [`PolicyMiddleware`] reads the caller identity from cookies, asks the
//! [`Session`] to evaluate the request and turns the [`Evaluation`] into an
//! HTTP response:
//!
//! | Evaluation | Response |
//! |------------|----------|
//! | blocked | `429 Too Many Requests`, nothing else applied |
//! | redirect | `307 Temporary Redirect` with `Location`, stage status in `x-waypoint-status` |
//! | rewrite | handler renders the target path, status forced to the stage status |
//! | otherwise | handler response |
//!
//! Every response that is not blocked carries the security headers and a
//! `Set-Cookie` with the incremented request counter.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Evaluation;
use crate::session::Session;
use crate::types::{Request, Response, ResponseExt};
use http::header::{HeaderName, HeaderValue, COOKIE, SET_COOKIE};
use http::{StatusCode, Uri};
use std::sync::Arc;
use waypoint_core::geo::DEFAULT_COUNTRY;
use waypoint_core::{ApiError, RequestContext, Role, RouteTable};

/// Cookie holding the session token. Any non-empty value counts as signed in.
pub const AUTH_COOKIE: &str = "auth_token";

/// Cookie holding the caller role.
pub const ROLE_COOKIE: &str = "user_role";

/// Cookie carrying the request counter between requests.
pub const COUNT_COOKIE: &str = "request_count";

/// Headers consulted, in order, for the caller country.
pub const GEO_COUNTRY_HEADERS: [&str; 2] = ["x-geo-country", "x-vercel-ip-country"];

/// Response header carrying the status the diverting stage chose.
///
/// Live redirects always answer 307 so clients follow them; the 401, 403 or
/// 451 recorded by the stage is reported here instead.
pub const STATUS_HEADER: &str = "x-waypoint-status";

/// Default lifetime of the counter cookie.
pub const DEFAULT_COOKIE_MAX_AGE_SECS: u64 = 3600;

/// Middleware enforcing the policy pipeline on live requests.
#[derive(Debug, Clone)]
pub struct PolicyMiddleware {
    session: Arc<Session>,
    default_country: String,
    cookie_max_age: u64,
}

impl PolicyMiddleware {
    /// Creates the middleware around a shared session.
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            default_country: DEFAULT_COUNTRY.to_string(),
            cookie_max_age: DEFAULT_COOKIE_MAX_AGE_SECS,
        }
    }

    /// Sets the country assumed when no geo header is present.
    #[must_use]
    pub fn with_default_country(mut self, country: impl AsRef<str>) -> Self {
        self.default_country = country.as_ref().trim().to_ascii_uppercase();
        self
    }

    /// Sets the `Max-Age` of the counter cookie.
    #[must_use]
    pub const fn with_cookie_max_age(mut self, secs: u64) -> Self {
        self.cookie_max_age = secs;
        self
    }

    /// Returns the session this middleware reports into.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Builds the pipeline context for `request`.
    ///
    /// The maintenance toggle is left off; the session supplies it.
    #[must_use]
    pub fn context_for(&self, request: &Request) -> RequestContext {
        let token = cookie(request, AUTH_COOKIE);
        let role = cookie(request, ROLE_COOKIE).map_or(Role::Guest, |v| Role::from_cookie(&v));
        let count = cookie(request, COUNT_COOKIE)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let country = GEO_COUNTRY_HEADERS
            .iter()
            .find_map(|name| {
                request
                    .headers()
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
            })
            .unwrap_or(self.default_country.as_str());

        let mut ctx = RequestContext::new(request.uri().path())
            .with_role(role)
            .with_country(country)
            .with_request_count(count);
        ctx.is_authenticated = token.is_some_and(|t| !t.is_empty());
        ctx
    }

    fn finish(&self, evaluation: &Evaluation, response: &mut Response) {
        let headers = response.headers_mut();
        for header in &evaluation.headers {
            if let Ok(name) = HeaderName::from_bytes(header.name.as_bytes()) {
                headers.insert(name, HeaderValue::from_static(header.value));
            }
        }

        let cookie = format!(
            "{COUNT_COOKIE}={}; Max-Age={}; Path=/",
            evaluation.request_count_after, self.cookie_max_age
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(SET_COOKIE, value);
        }
    }
}

impl Middleware for PolicyMiddleware {
    fn name(&self) -> &'static str {
        "policy"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let path = request.uri().path().to_string();
            if RouteTable::is_excluded(&path) {
                tracing::trace!(path = %path, "Path excluded from policy evaluation");
                return next.run(ctx, request).await;
            }

            let evaluation = self.session.evaluate_live(self.context_for(&request));
            let status =
                StatusCode::from_u16(evaluation.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

            let response = if evaluation.blocked {
                Response::text(status, "Too Many Requests")
            } else if evaluation.is_rewrite() {
                match evaluation.final_path.parse::<Uri>() {
                    Ok(uri) => {
                        *request.uri_mut() = uri;
                        let mut response = next.run(ctx, request).await;
                        *response.status_mut() = status;
                        self.finish(&evaluation, &mut response);
                        response
                    }
                    Err(e) => Response::api_error(&ApiError::server(format!(
                        "invalid rewrite target {}: {e}",
                        evaluation.final_path
                    ))),
                }
            } else if evaluation.redirected {
                let mut response =
                    Response::redirect(StatusCode::TEMPORARY_REDIRECT, &evaluation.final_path);
                response.headers_mut().insert(
                    HeaderName::from_static(STATUS_HEADER),
                    HeaderValue::from(status.as_u16()),
                );
                self.finish(&evaluation, &mut response);
                response
            } else {
                let mut response = next.run(ctx, request).await;
                self.finish(&evaluation, &mut response);
                response
            };

            ctx.set_extension(evaluation);
            response
        })
    }
}

/// Returns the value of cookie `name`, if the request carries it.
fn cookie(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PolicyPipeline;
    use bytes::Bytes;
    use http::header::LOCATION;
    use http_body_util::{BodyExt, Full};

    fn middleware() -> PolicyMiddleware {
        PolicyMiddleware::new(Arc::new(Session::new(PolicyPipeline::default())))
    }

    fn request(path: &str, cookies: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri(path);
        if let Some(cookies) = cookies {
            builder = builder.header(COOKIE, cookies);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    async fn run(mw: &PolicyMiddleware, request: Request) -> (Response, MiddlewareContext) {
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, req: Request| {
            let body = format!("page {}", req.uri().path());
            Box::pin(async move { Response::text(StatusCode::OK, body) })
        });
        let response = mw.process(&mut ctx, request, next).await;
        (response, ctx)
    }

    #[test]
    fn test_context_from_cookies() {
        let mw = middleware();
        let req = http::Request::builder()
            .uri("/admin?tab=users")
            .header(COOKIE, "auth_token=abc; user_role=admin; request_count=4")
            .header("x-geo-country", "kp")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let ctx = mw.context_for(&req);
        assert_eq!(ctx.path, "/admin");
        assert!(ctx.is_authenticated);
        assert_eq!(ctx.role, Role::Admin);
        assert_eq!(ctx.request_count, 4);
        assert_eq!(ctx.country, "KP");
    }

    #[test]
    fn test_context_defaults() {
        let mw = middleware().with_default_country("de");
        let ctx = mw.context_for(&request("/", Some("auth_token=; request_count=nope")));
        assert!(!ctx.is_authenticated);
        assert_eq!(ctx.role, Role::Guest);
        assert_eq!(ctx.request_count, 0);
        assert_eq!(ctx.country, "DE");
    }

    #[tokio::test]
    async fn test_page_served_with_headers_and_cookie() {
        let mw = middleware();
        let (response, ctx) = run(&mw, request("/about", Some("request_count=2"))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get(SET_COOKIE).unwrap(),
            "request_count=3; Max-Age=3600; Path=/"
        );
        assert!(ctx.get_extension::<Evaluation>().is_some());
    }

    #[tokio::test]
    async fn test_blocked_request() {
        let mw = middleware();
        let (response, _) = run(&mw, request("/", Some("request_count=10"))).await;

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert!(response.headers().get("x-frame-options").is_none());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Too Many Requests");
    }

    #[tokio::test]
    async fn test_protected_redirect() {
        let mw = middleware();
        let (response, ctx) = run(&mw, request("/dashboard", None)).await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/login?redirect=/dashboard"
        );
        assert_eq!(response.headers().get(STATUS_HEADER).unwrap(), "401");
        assert!(response.headers().contains_key(SET_COOKIE));
        assert_eq!(ctx.get_extension::<Evaluation>().unwrap().status_code, 401);
    }

    #[tokio::test]
    async fn test_every_diversion_is_a_followable_redirect() {
        let mw = middleware();
        let admin_as_user = request("/admin", Some("auth_token=t; user_role=user"));
        let mut premium_from_cn = request("/premium", None);
        premium_from_cn
            .headers_mut()
            .insert("x-geo-country", HeaderValue::from_static("CN"));

        for (req, location, stage_status) in [
            (request("/dashboard", None), "/login?redirect=/dashboard", "401"),
            (admin_as_user, "/403-forbidden", "403"),
            (premium_from_cn, "/geo-restricted", "451"),
            (request("/login", Some("auth_token=t")), "/dashboard", "307"),
        ] {
            let (response, _) = run(&mw, req).await;
            assert!(response.status().is_redirection(), "{location}");
            assert_eq!(response.headers().get(LOCATION).unwrap(), location);
            assert_eq!(response.headers().get(STATUS_HEADER).unwrap(), stage_status);
        }
    }

    #[tokio::test]
    async fn test_maintenance_rewrite_renders_target() {
        let mw = middleware();
        mw.session().set_maintenance(true);
        let (response, _) = run(&mw, request("/profile", Some("auth_token=t"))).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"page /maintenance");
    }

    #[tokio::test]
    async fn test_excluded_path_passes_through() {
        let mw = middleware();
        let (response, ctx) = run(&mw, request("/api/posts", Some("request_count=99"))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert!(ctx.get_extension::<Evaluation>().is_none());
        assert!(mw.session().records().is_empty());
    }

    #[tokio::test]
    async fn test_live_records_reach_session_log() {
        let mw = middleware();
        run(&mw, request("/", None)).await;

        assert!(!mw.session().records().is_empty());
        assert_eq!(mw.session().snapshot().request_count, 0);
    }
}

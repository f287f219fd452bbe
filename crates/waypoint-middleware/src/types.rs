//! Common types used throughout the middleware chain.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use waypoint_core::ApiError;

/// The HTTP request type used in the middleware chain.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware chain.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a plain-text response.
    fn text(status: StatusCode, body: impl Into<String>) -> Response;

    /// Creates a JSON response. Serialization failures become a 500 envelope.
    fn json<T: Serialize>(status: StatusCode, value: &T) -> Response;

    /// Creates the `{success: false, error}` response for `err`.
    fn api_error(err: &ApiError) -> Response;

    /// Creates a redirect to `location` with `status`.
    ///
    /// A location that is not a valid header value yields a 500 envelope.
    fn redirect(status: StatusCode, location: &str) -> Response;
}

impl ResponseExt for Response {
    fn text(status: StatusCode, body: impl Into<String>) -> Response {
        let mut response = Response::new(Full::new(Bytes::from(body.into())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    fn json<T: Serialize>(status: StatusCode, value: &T) -> Response {
        match serde_json::to_vec(value) {
            Ok(body) => {
                let mut response = Response::new(Full::new(Bytes::from(body)));
                *response.status_mut() = status;
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            Err(e) => Self::api_error(&ApiError::server(format!("failed to encode response: {e}"))),
        }
    }

    fn api_error(err: &ApiError) -> Response {
        let body = serde_json::to_vec(&err.envelope())
            .unwrap_or_else(|_| br#"{"success":false,"error":"internal error"}"#.to_vec());
        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = err.status_code();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn redirect(status: StatusCode, location: &str) -> Response {
        match HeaderValue::from_str(location) {
            Ok(value) => {
                let mut response = Response::new(Full::new(Bytes::new()));
                *response.status_mut() = status;
                response.headers_mut().insert(LOCATION, value);
                response
            }
            Err(_) => Self::api_error(&ApiError::server(format!(
                "invalid redirect target: {location}"
            ))),
        }
    }
}

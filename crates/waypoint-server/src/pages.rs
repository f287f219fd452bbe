//! Placeholder pages served behind the live middleware.
//!
//! Only the demo routes and the pages the pipeline diverts to exist; any
//! other path is a 404.

use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use waypoint_core::DemoRoute;
use waypoint_middleware::{Response, ResponseExt};

/// Pages the pipeline redirects or rewrites to.
const DIVERSION_PAGES: &[(&str, &str)] = &[
    ("/maintenance", "Down for maintenance"),
    ("/geo-restricted", "Not available in your region"),
    ("/403-forbidden", "Forbidden"),
];

/// Returns the page title for `path`, if the page exists.
#[must_use]
pub fn page_title(path: &str) -> Option<&'static str> {
    DIVERSION_PAGES
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, title)| *title)
        .or_else(|| {
            DemoRoute::catalogue()
                .into_iter()
                .find(|route| route.path == path)
                .map(|route| route.label)
        })
        .or_else(|| (path == "/exclusive").then_some("Exclusive"))
}

/// Renders the page for `path`.
#[must_use]
pub fn render_page(path: &str) -> Response {
    let Some(title) = page_title(path) else {
        return Response::text(StatusCode::NOT_FOUND, "Not Found");
    };

    let html = format!(
        "<!doctype html>\n<html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{path}</p></body></html>\n"
    );
    let mut response = Response::text(StatusCode::OK, html);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
}

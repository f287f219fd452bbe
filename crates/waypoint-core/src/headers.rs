//! Security headers applied to every non-blocked response.

use serde::Serialize;

/// A response header set by the security headers stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecurityHeader {
    /// Header name.
    pub name: &'static str,
    /// Header value.
    pub value: &'static str,
}

/// Headers the security stage attaches, in application order.
pub const SECURITY_HEADERS: &[SecurityHeader] = &[
    SecurityHeader {
        name: "X-Frame-Options",
        value: "DENY",
    },
    SecurityHeader {
        name: "X-Content-Type-Options",
        value: "nosniff",
    },
    SecurityHeader {
        name: "Referrer-Policy",
        value: "strict-origin-when-cross-origin",
    },
    SecurityHeader {
        name: "Content-Security-Policy",
        value: "default-src 'self'",
    },
    SecurityHeader {
        name: "Strict-Transport-Security",
        value: "max-age=63072000; includeSubDomains",
    },
];

/// Returns the header names joined for display.
#[must_use]
pub fn header_names() -> String {
    SECURITY_HEADERS
        .iter()
        .map(|h| h.name)
        .collect::<Vec<_>>()
        .join(", ")
}

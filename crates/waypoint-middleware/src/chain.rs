//! HTTP middleware chain.
//!
//! A [`MiddlewareChain`] wraps a page handler with a list of
//! [`Middleware`] values. The list is frozen at build time; requests flow
//! through it front to back and responses back to front.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Header carrying the request ID on responses.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// An immutable chain of middleware.
///
/// # Example
///
/// ```
/// use waypoint_middleware::chain::{MiddlewareChain, RequestIdMiddleware};
///
/// let chain = MiddlewareChain::builder()
///     .with(RequestIdMiddleware)
///     .build();
///
/// assert_eq!(chain.names(), vec!["request_id"]);
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middleware: Vec<BoxedMiddleware>,
}

impl MiddlewareChain {
    /// Creates a new chain builder.
    #[must_use]
    pub fn builder() -> MiddlewareChainBuilder {
        MiddlewareChainBuilder::default()
    }

    /// Runs `request` through the chain and then `handler`.
    ///
    /// The context is borrowed so callers can read extensions the
    /// middleware left behind.
    pub async fn process<H>(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        next.run(ctx, request).await
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.middleware.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the middleware names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of middleware in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Returns true if the chain holds no middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("middleware", &self.names())
            .finish()
    }
}

/// Builder for [`MiddlewareChain`].
#[derive(Default)]
pub struct MiddlewareChainBuilder {
    middleware: Vec<BoxedMiddleware>,
}

impl MiddlewareChainBuilder {
    /// Appends a middleware.
    #[must_use]
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware.
    #[must_use]
    pub fn with_shared(mut self, middleware: BoxedMiddleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Freezes the chain.
    #[must_use]
    pub fn build(self) -> MiddlewareChain {
        MiddlewareChain {
            middleware: self.middleware,
        }
    }
}

/// Adds the context's request ID to every response.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdMiddleware;

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = ctx.request_id();
            let mut response = next.run(ctx, request).await;
            if let Ok(value) = request_id.to_string().parse() {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn name(&self) -> &'static str {
            "short_circuit"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut MiddlewareContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async { Response::text(StatusCode::SERVICE_UNAVAILABLE, "down") })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_chain_runs_handler() {
        let chain = MiddlewareChain::builder().build();
        assert!(chain.is_empty());

        let mut ctx = MiddlewareContext::new();
        let response = chain
            .process(&mut ctx, request(), |_ctx, _req| {
                Box::pin(async { Response::text(StatusCode::OK, "home") })
            })
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_id_header() {
        let chain = MiddlewareChain::builder().with(RequestIdMiddleware).build();
        let mut ctx = MiddlewareContext::new();
        let expected = ctx.request_id().to_string();

        let response = chain
            .process(&mut ctx, request(), |_ctx, _req| {
                Box::pin(async { Response::text(StatusCode::OK, "home") })
            })
            .await;
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            expected.as_str()
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let chain = MiddlewareChain::builder()
            .with(RequestIdMiddleware)
            .with(ShortCircuit)
            .build();
        assert_eq!(chain.names(), vec!["request_id", "short_circuit"]);

        let mut ctx = MiddlewareContext::new();
        let response = chain
            .process(&mut ctx, request(), |_ctx, _req| {
                Box::pin(async { Response::text(StatusCode::OK, "home") })
            })
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }
}

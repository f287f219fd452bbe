//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the HTTP
//! middleware chain.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use waypoint_core::RequestId;

/// Context that flows through the middleware chain.
///
/// # Example
///
/// ```
/// use waypoint_middleware::context::MiddlewareContext;
///
/// #[derive(Clone)]
/// struct Tenant(&'static str);
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_extension(Tenant("acme"));
///
/// assert_eq!(ctx.get_extension::<Tenant>().unwrap().0, "acme");
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a new context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous value of `T`.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Removes and returns a typed extension value.
    pub fn take_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_preserved() {
        let id = RequestId::new();
        assert_eq!(MiddlewareContext::with_request_id(id).request_id(), id);
    }

    #[test]
    fn test_extensions() {
        let mut ctx = MiddlewareContext::new();
        assert!(ctx.get_extension::<u32>().is_none());

        ctx.set_extension(7_u32);
        ctx.set_extension(9_u32);
        assert_eq!(ctx.get_extension::<u32>(), Some(&9));

        assert_eq!(ctx.take_extension::<u32>(), Some(9));
        assert!(ctx.get_extension::<u32>().is_none());
    }
}

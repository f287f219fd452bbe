//! Policy stages.
//!
//! Each stage inspects the [`RequestContext`] and the running [`PassState`]
//! and appends the decision records it produces. Stages run in a fixed order:
//!
//! 1. [`rate_limit`] - block callers over the request limit
//! 2. [`maintenance`] - rewrite non-admins to the maintenance page
//! 3. [`geolocation`] - keep blocked countries out of geo-restricted content
//! 4. [`routes`] - public, auth, protected and admin route checks
//! 5. [`security_headers`] - attach the security header set
//! 6. [`resolution`] - summarize the resolved path and status
//!
//! A block ends the pass immediately. A redirect or rewrite skips the
//! remaining route checks, but headers and the final resolution still run.

pub mod geolocation;
pub mod maintenance;
pub mod rate_limit;
pub mod resolution;
pub mod routes;
pub mod security_headers;

pub use geolocation::GeolocationStage;
pub use maintenance::MaintenanceStage;
pub use rate_limit::RateLimitStage;
pub use resolution::ResolutionStage;
pub use routes::{AdminRoutesStage, AuthRoutesStage, ProtectedRoutesStage, PublicRoutesStage};
pub use security_headers::SecurityHeadersStage;

use std::time::Instant;
use waypoint_core::{DecisionRecord, Outcome, RequestContext, SecurityHeader, StageName};

/// One policy check in the ordered pipeline.
pub trait PolicyStage: Send + Sync + 'static {
    /// Returns the stage identity used on its records.
    fn name(&self) -> StageName;

    /// Whether the stage still runs after an earlier redirect or rewrite.
    ///
    /// No stage runs after a block.
    fn runs_after_diversion(&self) -> bool {
        false
    }

    /// Evaluates the stage, appending records to `pass`.
    fn evaluate(&self, ctx: &RequestContext, pass: &mut PassState);
}

/// Mutable state of one pipeline pass.
#[derive(Debug)]
pub struct PassState {
    records: Vec<DecisionRecord>,
    final_path: String,
    status_code: u16,
    blocked: bool,
    redirected: bool,
    terminal: Option<Outcome>,
    request_count_after: u32,
    headers: Vec<SecurityHeader>,
    started_at: Instant,
}

impl PassState {
    /// Starts a pass for `ctx` with status 200 and the path unchanged.
    #[must_use]
    pub fn new(ctx: &RequestContext) -> Self {
        Self {
            records: Vec::new(),
            final_path: ctx.path.clone(),
            status_code: 200,
            blocked: false,
            redirected: false,
            terminal: None,
            request_count_after: ctx.request_count,
            headers: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Appends a record.
    pub fn record(&mut self, record: DecisionRecord) {
        self.records.push(record);
    }

    /// Ends the pass with a block.
    pub fn block(&mut self, status: u16) {
        self.blocked = true;
        self.status_code = status;
        self.terminal = Some(Outcome::Block);
    }

    /// Sends the request to `target` with `status`.
    ///
    /// `outcome` is [`Outcome::Redirect`] or [`Outcome::Rewrite`].
    pub fn divert(&mut self, outcome: Outcome, target: impl Into<String>, status: u16) {
        self.redirected = true;
        self.final_path = target.into();
        self.status_code = status;
        self.terminal = Some(outcome);
    }

    /// Counts this pass against the caller's request budget.
    pub fn count_request(&mut self) {
        self.request_count_after = self.request_count_after.saturating_add(1);
    }

    /// Records the security headers to apply.
    pub fn apply_headers(&mut self, headers: &[SecurityHeader]) {
        self.headers.extend_from_slice(headers);
    }

    /// Returns true once a stage blocked the request.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Returns true once a stage redirected or rewrote the request.
    #[must_use]
    pub const fn is_redirected(&self) -> bool {
        self.redirected
    }

    /// Path the request currently resolves to.
    #[must_use]
    pub fn final_path(&self) -> &str {
        &self.final_path
    }

    /// Status the request currently resolves to.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Counter value after this pass.
    #[must_use]
    pub const fn request_count_after(&self) -> u32 {
        self.request_count_after
    }

    /// When the pass started.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    pub(crate) fn into_parts(self) -> PassParts {
        PassParts {
            records: self.records,
            final_path: self.final_path,
            status_code: self.status_code,
            blocked: self.blocked,
            redirected: self.redirected,
            terminal: self.terminal,
            request_count_after: self.request_count_after,
            headers: self.headers,
        }
    }
}

pub(crate) struct PassParts {
    pub records: Vec<DecisionRecord>,
    pub final_path: String,
    pub status_code: u16,
    pub blocked: bool,
    pub redirected: bool,
    pub terminal: Option<Outcome>,
    pub request_count_after: u32,
    pub headers: Vec<SecurityHeader>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_defaults() {
        let ctx = RequestContext::new("/about").with_request_count(4);
        let pass = PassState::new(&ctx);

        assert_eq!(pass.final_path(), "/about");
        assert_eq!(pass.status_code(), 200);
        assert_eq!(pass.request_count_after(), 4);
        assert!(!pass.is_blocked());
        assert!(!pass.is_redirected());
    }

    #[test]
    fn test_divert_and_block() {
        let ctx = RequestContext::new("/dashboard");
        let mut pass = PassState::new(&ctx);

        pass.divert(Outcome::Redirect, "/login?redirect=/dashboard", 401);
        assert!(pass.is_redirected());
        assert_eq!(pass.final_path(), "/login?redirect=/dashboard");

        pass.block(429);
        let parts = pass.into_parts();
        assert!(parts.blocked);
        assert_eq!(parts.terminal, Some(Outcome::Block));
        assert_eq!(parts.status_code, 429);
    }
}

//! Rate limiting stage.
//!
//! The counter is kept per session (or per caller cookie in live mode) and
//! never decays. Once it reaches the limit every further pass is blocked
//! with 429 and produces exactly one record.

use super::{PassState, PolicyStage};
use waypoint_core::{DecisionRecord, Level, Outcome, RequestContext, StageName};

/// Requests allowed before the limiter blocks.
pub const DEFAULT_RATE_LIMIT: u32 = 10;

/// Blocks callers whose counter reached the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStage {
    limit: u32,
}

impl RateLimitStage {
    /// Creates a limiter allowing `limit` requests.
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self { limit }
    }

    /// Returns the configured limit.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for RateLimitStage {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT)
    }
}

impl PolicyStage for RateLimitStage {
    fn name(&self) -> StageName {
        StageName::RateLimit
    }

    fn evaluate(&self, ctx: &RequestContext, pass: &mut PassState) {
        if ctx.request_count >= self.limit {
            pass.record(
                DecisionRecord::new(
                    self.name(),
                    Level::Error,
                    "🚫",
                    "BLOCKED: request limit reached",
                )
                .with_details(format!(
                    "Rate Limit: {}/{} requests",
                    ctx.request_count, self.limit
                ))
                .with_outcome(Outcome::Block)
                .with_status(429),
            );
            pass.block(429);
            return;
        }

        pass.count_request();
        pass.record(
            DecisionRecord::new(
                self.name(),
                Level::Success,
                "✅",
                format!("Rate limit OK ({}/{})", pass.request_count_after(), self.limit),
            )
            .with_outcome(Outcome::Continue),
        );
    }
}

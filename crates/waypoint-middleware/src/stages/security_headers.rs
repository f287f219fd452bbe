//! Security headers stage.

use super::{PassState, PolicyStage};
use waypoint_core::headers::{header_names, SECURITY_HEADERS};
use waypoint_core::{DecisionRecord, Level, Outcome, RequestContext, StageName};

/// Attaches the fixed security header set to every non-blocked pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityHeadersStage;

impl PolicyStage for SecurityHeadersStage {
    fn name(&self) -> StageName {
        StageName::SecurityHeaders
    }

    fn runs_after_diversion(&self) -> bool {
        true
    }

    fn evaluate(&self, _ctx: &RequestContext, pass: &mut PassState) {
        pass.apply_headers(SECURITY_HEADERS);
        pass.record(
            DecisionRecord::new(self.name(), Level::Success, "🔐", "Security headers added")
                .with_details(header_names())
                .with_outcome(Outcome::AddHeaders),
        );
    }
}

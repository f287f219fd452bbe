//! Final resolution stage.

use super::{PassState, PolicyStage};
use waypoint_core::{DecisionRecord, Level, RequestContext, StageName};

/// Appends the closing record with the resolved path, status and timing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStage;

impl PolicyStage for ResolutionStage {
    fn name(&self) -> StageName {
        StageName::Response
    }

    fn runs_after_diversion(&self) -> bool {
        true
    }

    fn evaluate(&self, _ctx: &RequestContext, pass: &mut PassState) {
        let elapsed_ms = pass.started_at().elapsed().as_millis();
        let status = pass.status_code();

        let record = if pass.is_redirected() {
            DecisionRecord::new(
                self.name(),
                Level::Warning,
                "↪️",
                format!("Redirect: {}", pass.final_path()),
            )
        } else {
            DecisionRecord::new(
                self.name(),
                Level::Success,
                "✨",
                format!("Page served: {}", pass.final_path()),
            )
        };

        let record = record
            .with_details(format!("Status: {status} | Time: {elapsed_ms}ms"))
            .with_status(status)
            .with_target(pass.final_path().to_string())
            .finalize();
        pass.record(record);
    }
}

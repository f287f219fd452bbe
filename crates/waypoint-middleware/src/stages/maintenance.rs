//! Maintenance mode stage.

use super::{PassState, PolicyStage};
use waypoint_core::{DecisionRecord, Level, Outcome, RequestContext, StageName};

/// Path non-admin callers are rewritten to while maintenance is on.
pub const MAINTENANCE_PATH: &str = "/maintenance";

/// Rewrites non-admin callers to the maintenance page.
///
/// Admins pass through with an informational record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceStage;

impl PolicyStage for MaintenanceStage {
    fn name(&self) -> StageName {
        StageName::Maintenance
    }

    fn evaluate(&self, ctx: &RequestContext, pass: &mut PassState) {
        if !ctx.maintenance_mode {
            return;
        }

        if ctx.role.is_admin() {
            pass.record(
                DecisionRecord::new(self.name(), Level::Info, "👑", "Maintenance bypass - Admin")
                    .with_details("Admin access allowed during maintenance"),
            );
            return;
        }

        pass.record(
            DecisionRecord::new(self.name(), Level::Warning, "🚧", "Maintenance mode active")
                .with_details("Rewritten to /maintenance (admins excepted)")
                .with_outcome(Outcome::Rewrite)
                .with_status(503)
                .with_route_change(ctx.path.clone(), MAINTENANCE_PATH),
        );
        pass.divert(Outcome::Rewrite, MAINTENANCE_PATH, 503);
    }
}

//! Route category stages.
//!
//! Each stage checks only its own category predicate. A path listed as
//! public is still subject to the protected and admin checks when it also
//! matches those prefixes.

use super::{PassState, PolicyStage};
use std::sync::Arc;
use waypoint_core::{DecisionRecord, Level, Outcome, RequestContext, Role, RouteTable, StageName};

/// Where authenticated callers are sent from login and registration pages.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Login page.
pub const LOGIN_PATH: &str = "/login";

/// Where authenticated non-admins are sent from admin routes.
pub const FORBIDDEN_PATH: &str = "/403-forbidden";

/// Builds the login redirect carrying the original path.
///
/// The path is appended as-is.
///
/// ```
/// use waypoint_middleware::stages::routes::login_redirect;
///
/// assert_eq!(login_redirect("/settings"), "/login?redirect=/settings");
/// ```
#[must_use]
pub fn login_redirect(path: &str) -> String {
    format!("{LOGIN_PATH}?redirect={path}")
}

/// Notes exact-match public routes.
#[derive(Debug, Clone)]
pub struct PublicRoutesStage {
    routes: Arc<RouteTable>,
}

impl PublicRoutesStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes }
    }
}

impl PolicyStage for PublicRoutesStage {
    fn name(&self) -> StageName {
        StageName::PublicRoutes
    }

    fn evaluate(&self, ctx: &RequestContext, pass: &mut PassState) {
        if !self.routes.is_public(&ctx.path) {
            return;
        }

        pass.record(
            DecisionRecord::new(self.name(), Level::Success, "🌐", "Public route: access granted")
                .with_details("No authentication required")
                .with_outcome(Outcome::Continue),
        );
    }
}

/// Sends signed-in callers away from login and registration pages.
#[derive(Debug, Clone)]
pub struct AuthRoutesStage {
    routes: Arc<RouteTable>,
}

impl AuthRoutesStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes }
    }
}

impl PolicyStage for AuthRoutesStage {
    fn name(&self) -> StageName {
        StageName::AuthRoutes
    }

    fn evaluate(&self, ctx: &RequestContext, pass: &mut PassState) {
        if !self.routes.is_auth(&ctx.path) {
            return;
        }

        if ctx.is_authenticated {
            pass.record(
                DecisionRecord::new(self.name(), Level::Info, "↪️", "User already signed in")
                    .with_details("Redirected to the dashboard")
                    .with_outcome(Outcome::Redirect)
                    .with_status(307)
                    .with_route_change(ctx.path.clone(), DASHBOARD_PATH),
            );
            pass.divert(Outcome::Redirect, DASHBOARD_PATH, 307);
        } else {
            pass.record(
                DecisionRecord::new(self.name(), Level::Success, "🔓", "Access to authentication pages")
                    .with_outcome(Outcome::Continue),
            );
        }
    }
}

/// Requires authentication on protected prefixes.
#[derive(Debug, Clone)]
pub struct ProtectedRoutesStage {
    routes: Arc<RouteTable>,
}

impl ProtectedRoutesStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes }
    }
}

impl PolicyStage for ProtectedRoutesStage {
    fn name(&self) -> StageName {
        StageName::ProtectedRoutes
    }

    fn evaluate(&self, ctx: &RequestContext, pass: &mut PassState) {
        if !self.routes.is_protected(&ctx.path) {
            return;
        }

        if ctx.is_authenticated {
            pass.record(
                DecisionRecord::new(self.name(), Level::Success, "✅", "User authenticated")
                    .with_details(format!("Role: {} | Token valid", ctx.role))
                    .with_outcome(Outcome::Continue),
            );
            return;
        }

        let target = login_redirect(&ctx.path);
        pass.record(
            DecisionRecord::new(self.name(), Level::Error, "🔒", "Authentication required")
                .with_details(format!("Redirected to {target}"))
                .with_outcome(Outcome::Redirect)
                .with_status(401)
                .with_route_change(ctx.path.clone(), target.clone()),
        );
        pass.divert(Outcome::Redirect, target, 401);
    }
}

/// Requires the admin role on admin prefixes.
#[derive(Debug, Clone)]
pub struct AdminRoutesStage {
    routes: Arc<RouteTable>,
}

impl AdminRoutesStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes }
    }
}

impl PolicyStage for AdminRoutesStage {
    fn name(&self) -> StageName {
        StageName::AdminRoutes
    }

    fn evaluate(&self, ctx: &RequestContext, pass: &mut PassState) {
        if !self.routes.is_admin(&ctx.path) {
            return;
        }

        if !ctx.is_authenticated {
            pass.record(
                DecisionRecord::new(self.name(), Level::Error, "🔒", "Admin authentication required")
                    .with_details(format!("Redirected to {LOGIN_PATH}"))
                    .with_outcome(Outcome::Redirect)
                    .with_status(401)
                    .with_route_change(ctx.path.clone(), LOGIN_PATH),
            );
            pass.divert(Outcome::Redirect, LOGIN_PATH, 401);
        } else if ctx.role != Role::Admin {
            pass.record(
                DecisionRecord::new(self.name(), Level::Error, "⛔", "Insufficient privileges")
                    .with_details(format!("Current role: {} | Required: admin", ctx.role))
                    .with_outcome(Outcome::Redirect)
                    .with_status(403)
                    .with_route_change(ctx.path.clone(), FORBIDDEN_PATH),
            );
            pass.divert(Outcome::Redirect, FORBIDDEN_PATH, 403);
        } else {
            pass.record(
                DecisionRecord::new(self.name(), Level::Success, "👑", "Administrator access granted")
                    .with_details("Admin privileges confirmed")
                    .with_outcome(Outcome::Continue),
            );
        }
    }
}

//! Geolocation stage.
//!
//! Only geo-restricted paths are checked. The stage first notes the detected
//! country, then either lets the request through or redirects it to
//! `/geo-restricted` with 451.

use super::{PassState, PolicyStage};
use std::sync::Arc;
use waypoint_core::geo::{self, DEFAULT_BLOCKED_COUNTRIES};
use waypoint_core::{DecisionRecord, Level, Outcome, RequestContext, RouteTable, StageName};

/// Redirect target for callers from blocked countries.
pub const GEO_RESTRICTED_PATH: &str = "/geo-restricted";

/// Keeps blocked countries out of geo-restricted routes.
#[derive(Debug, Clone)]
pub struct GeolocationStage {
    routes: Arc<RouteTable>,
    blocked_countries: Vec<String>,
}

impl GeolocationStage {
    /// Creates the stage with the default blocked set.
    #[must_use]
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self {
            routes,
            blocked_countries: DEFAULT_BLOCKED_COUNTRIES
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
        }
    }

    /// Replaces the blocked country set.
    #[must_use]
    pub fn with_blocked_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_countries = countries.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the blocked country set.
    #[must_use]
    pub fn blocked_countries(&self) -> &[String] {
        &self.blocked_countries
    }
}

impl PolicyStage for GeolocationStage {
    fn name(&self) -> StageName {
        StageName::Geolocation
    }

    fn evaluate(&self, ctx: &RequestContext, pass: &mut PassState) {
        if !self.routes.is_geo_restricted(&ctx.path) {
            return;
        }

        pass.record(
            DecisionRecord::new(
                self.name(),
                Level::Info,
                "🌍",
                format!("Geolocation detected: {}", ctx.country),
            )
            .with_details(format!("Continent: {}", geo::continent_of(&ctx.country))),
        );

        if geo::is_blocked(&self.blocked_countries, &ctx.country) {
            pass.record(
                DecisionRecord::new(self.name(), Level::Error, "🚫", "Geographic access denied")
                    .with_details(format!("Content not available in {}", ctx.country))
                    .with_outcome(Outcome::Redirect)
                    .with_status(451)
                    .with_route_change(ctx.path.clone(), GEO_RESTRICTED_PATH),
            );
            pass.divert(Outcome::Redirect, GEO_RESTRICTED_PATH, 451);
        } else {
            pass.record(
                DecisionRecord::new(self.name(), Level::Success, "✅", "Geographic access allowed")
                    .with_outcome(Outcome::Continue),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> GeolocationStage {
        GeolocationStage::new(Arc::new(RouteTable::default()))
    }

    #[test]
    fn test_unrestricted_path_skipped() {
        let ctx = RequestContext::new("/about").with_country("CN");
        let mut pass = PassState::new(&ctx);
        stage().evaluate(&ctx, &mut pass);
        assert!(pass.into_parts().records.is_empty());
    }

    #[test]
    fn test_blocked_country_redirected() {
        let ctx = RequestContext::new("/premium/offers").with_country("kp");
        let mut pass = PassState::new(&ctx);

        stage().evaluate(&ctx, &mut pass);

        assert_eq!(pass.final_path(), "/geo-restricted");
        assert_eq!(pass.status_code(), 451);
        let parts = pass.into_parts();
        assert_eq!(parts.records.len(), 2);
        assert_eq!(parts.records[0].message, "Geolocation detected: KP");
        assert_eq!(parts.records[0].details.as_deref(), Some("Continent: Asia"));
        assert_eq!(parts.records[1].outcome, Some(Outcome::Redirect));
    }

    #[test]
    fn test_allowed_country_continues() {
        let ctx = RequestContext::new("/exclusive").with_country("FR");
        let mut pass = PassState::new(&ctx);

        stage().evaluate(&ctx, &mut pass);

        assert!(!pass.is_redirected());
        let parts = pass.into_parts();
        assert_eq!(parts.records[1].outcome, Some(Outcome::Continue));
    }

    #[test]
    fn test_custom_blocked_set() {
        let stage = stage().with_blocked_countries(["FR"]);
        let ctx = RequestContext::new("/premium").with_country("FR");
        let mut pass = PassState::new(&ctx);

        stage.evaluate(&ctx, &mut pass);
        assert!(pass.is_redirected());
        assert_eq!(stage.blocked_countries(), ["FR".to_string()]);
    }
}

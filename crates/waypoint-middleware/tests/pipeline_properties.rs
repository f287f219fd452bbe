//! Property-based tests for the policy pipeline.

use proptest::prelude::*;
use waypoint_core::{Level, Outcome, RequestContext, Role, StageName};
use waypoint_middleware::PolicyPipeline;

const LIMIT: u32 = 10;

fn arb_path() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "/", "/about", "/login", "/register", "/dashboard", "/profile", "/settings", "/admin",
            "/admin/users", "/premium", "/exclusive", "/contact",
        ])
        .prop_map(String::from),
        "/[a-z]{1,12}(/[a-z]{1,8}){0,2}",
    ]
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Guest), Just(Role::User), Just(Role::Admin)]
}

fn arb_country() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec!["US", "CN", "KP", "DE", "JP", "BR"]).prop_map(String::from),
        "[A-Z]{2}",
    ]
}

fn arb_context() -> impl Strategy<Value = RequestContext> {
    (arb_path(), any::<bool>(), arb_role(), arb_country(), 0..LIMIT * 2, any::<bool>()).prop_map(
        |(path, authenticated, role, country, count, maintenance)| {
            let mut ctx = RequestContext::new(path)
                .with_role(role)
                .with_country(country)
                .with_request_count(count)
                .with_maintenance(maintenance);
            ctx.is_authenticated = authenticated;
            ctx
        },
    )
}

fn suffixed(bases: &'static [&'static str]) -> impl Strategy<Value = String> {
    (prop::sample::select(bases), "(/[a-z]{1,8})?").prop_map(|(base, rest)| format!("{base}{rest}"))
}

proptest! {
    /// A caller at or over the limit gets exactly one record and nothing else.
    #[test]
    fn prop_block_short_circuits(ctx in arb_context(), over in 0..LIMIT) {
        let ctx = ctx.with_request_count(LIMIT + over);
        let evaluation = PolicyPipeline::default().evaluate(&ctx);

        prop_assert!(evaluation.blocked);
        prop_assert_eq!(evaluation.status_code, 429);
        prop_assert_eq!(evaluation.records.len(), 1);
        prop_assert_eq!(evaluation.records[0].stage, StageName::RateLimit);
        prop_assert!(evaluation.headers.is_empty());
        prop_assert_eq!(evaluation.request_count_after, ctx.request_count);
    }

    /// Every pass that is not blocked counts once, sets headers and ends with the final record.
    #[test]
    fn prop_unblocked_pass_completes(ctx in arb_context()) {
        prop_assume!(ctx.request_count < LIMIT);
        let evaluation = PolicyPipeline::default().evaluate(&ctx);

        prop_assert!(!evaluation.blocked);
        prop_assert_eq!(evaluation.request_count_after, ctx.request_count + 1);
        prop_assert!(!evaluation.headers.is_empty());

        let last = evaluation.records.last().unwrap();
        prop_assert_eq!(last.stage, StageName::Response);
        prop_assert!(last.is_final);
        prop_assert_eq!(evaluation.records.iter().filter(|r| r.is_final).count(), 1);
    }

    /// Non-admins under maintenance always land on the maintenance page.
    #[test]
    fn prop_maintenance_rewrites_non_admins(ctx in arb_context()) {
        prop_assume!(ctx.request_count < LIMIT && ctx.role != Role::Admin);
        let ctx = ctx.with_maintenance(true);
        let evaluation = PolicyPipeline::default().evaluate(&ctx);

        prop_assert_eq!(evaluation.final_path.as_str(), "/maintenance");
        prop_assert_eq!(evaluation.status_code, 503);
        prop_assert_eq!(evaluation.terminal, Some(Outcome::Rewrite));
        prop_assert!(evaluation.records_for(StageName::Geolocation).next().is_none());
    }

    /// Admins pass maintenance with an informational record only.
    #[test]
    fn prop_admin_bypasses_maintenance(ctx in arb_context()) {
        prop_assume!(ctx.request_count < LIMIT);
        let ctx = ctx.with_role(Role::Admin).with_maintenance(true);
        let evaluation = PolicyPipeline::default().evaluate(&ctx);

        let records: Vec<_> = evaluation.records_for(StageName::Maintenance).collect();
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(records[0].level, Level::Info);
        prop_assert!(records[0].outcome.is_none());
        prop_assert_ne!(evaluation.terminal, Some(Outcome::Rewrite));
    }

    /// Blocked countries never reach geo-restricted content.
    #[test]
    fn prop_geo_block(
        path in suffixed(&["/premium", "/exclusive"]),
        country in prop::sample::select(vec!["CN", "KP", "cn", "kp"]),
        authenticated in any::<bool>(),
    ) {
        let mut ctx = RequestContext::new(path).with_country(country);
        ctx.is_authenticated = authenticated;
        let evaluation = PolicyPipeline::default().evaluate(&ctx);

        prop_assert_eq!(evaluation.final_path.as_str(), "/geo-restricted");
        prop_assert_eq!(evaluation.status_code, 451);
    }

    /// Signed-in callers are sent from the auth pages to the dashboard.
    #[test]
    fn prop_auth_pages_redirect_signed_in(
        path in prop::sample::select(vec!["/login", "/register"]),
        role in arb_role(),
    ) {
        let ctx = RequestContext::new(path).authenticated(role);
        let evaluation = PolicyPipeline::default().evaluate(&ctx);

        prop_assert_eq!(evaluation.final_path.as_str(), "/dashboard");
        prop_assert_eq!(evaluation.status_code, 307);
    }

    /// Anonymous callers on protected routes are sent to login with a return path.
    #[test]
    fn prop_protected_requires_login(path in suffixed(&["/dashboard", "/profile", "/settings"])) {
        let evaluation = PolicyPipeline::default().evaluate(&RequestContext::new(path.clone()));

        prop_assert_eq!(evaluation.final_path, format!("/login?redirect={path}"));
        prop_assert_eq!(evaluation.status_code, 401);
    }

    /// The pipeline is a pure function of its context.
    #[test]
    fn prop_evaluation_is_deterministic(ctx in arb_context()) {
        let pipeline = PolicyPipeline::default();
        let first = pipeline.evaluate(&ctx);
        let second = pipeline.evaluate(&ctx);

        prop_assert_eq!(&first.final_path, &second.final_path);
        prop_assert_eq!(first.status_code, second.status_code);
        prop_assert_eq!(first.terminal, second.terminal);
        let messages = |e: &waypoint_middleware::Evaluation| {
            e.records
                .iter()
                .filter(|r| r.stage != StageName::Response)
                .map(|r| (r.stage, r.message.clone()))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(messages(&first), messages(&second));
    }
}

#[test]
fn admin_scenario_user_role_is_forbidden() {
    let ctx = RequestContext::new("/admin/users").authenticated(Role::User);
    let evaluation = PolicyPipeline::default().evaluate(&ctx);

    assert_eq!(evaluation.final_path, "/403-forbidden");
    assert_eq!(evaluation.status_code, 403);
    let stages: Vec<_> = evaluation.records.iter().map(|r| r.stage).collect();
    assert_eq!(
        stages,
        [
            StageName::RateLimit,
            StageName::AdminRoutes,
            StageName::SecurityHeaders,
            StageName::Response
        ]
    );
}

#[test]
fn home_scenario_serves_page() {
    let evaluation = PolicyPipeline::default().evaluate(&RequestContext::new("/"));

    assert_eq!(evaluation.final_path, "/");
    assert_eq!(evaluation.status_code, 200);
    assert!(!evaluation.redirected);
    let stages: Vec<_> = evaluation.records.iter().map(|r| r.stage).collect();
    assert_eq!(
        stages,
        [
            StageName::RateLimit,
            StageName::PublicRoutes,
            StageName::SecurityHeaders,
            StageName::Response
        ]
    );
}

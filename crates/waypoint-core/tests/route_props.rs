//! Property tests for route classification and the error envelope.

use proptest::prelude::*;
use waypoint_core::{ApiError, RouteCategory, RouteTable};

fn arb_path() -> impl Strategy<Value = String> {
    "/[a-z0-9-]{0,16}(/[a-z0-9-]{1,8}){0,3}"
}

proptest! {
    #[test]
    fn prop_classify_agrees_with_categories(path in arb_path()) {
        let table = RouteTable::default();
        let categories = table.categories(&path);
        let expected = categories.first().copied().unwrap_or(RouteCategory::Uncategorized);
        prop_assert_eq!(table.classify(&path), expected);
    }

    #[test]
    fn prop_protected_prefix_covers_children(
        base in prop::sample::select(vec!["/dashboard", "/profile", "/settings"]),
        child in "[a-z]{1,8}",
    ) {
        let table = RouteTable::default();
        let child_path = format!("{base}/{child}");
        prop_assert!(table.is_protected(base));
        prop_assert!(table.is_protected(&child_path));
    }

    #[test]
    fn prop_public_is_exact(suffix in "[a-z]{1,8}") {
        let table = RouteTable::default();
        let about_child = format!("/about/{suffix}");
        prop_assert!(!table.is_public(&about_child));
    }

    #[test]
    fn prop_envelope_never_succeeds(message in ".{0,40}") {
        for err in [
            ApiError::network(message.clone()),
            ApiError::not_found(message.clone()),
            ApiError::validation(message.clone()),
            ApiError::server(message.clone()),
        ] {
            let envelope = err.envelope();
            prop_assert!(!envelope.success);
            prop_assert_eq!(envelope.error, err.to_string());
        }
    }
}

#[test]
fn default_table_has_no_overlaps() {
    assert!(RouteTable::default().overlaps().is_empty());
}

#[test]
fn png_and_static_assets_are_excluded() {
    for path in ["/logo.png", "/_next/static/chunk.js", "/favicon.ico", "/api"] {
        assert!(RouteTable::is_excluded(path), "{path}");
    }
    assert!(!RouteTable::is_excluded("/apiary"));
}

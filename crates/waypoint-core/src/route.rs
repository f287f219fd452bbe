//! Route classification.
//!
//! The [`RouteTable`] is the single source of truth for which paths belong to
//! which category. Public and auth routes match exactly; protected, admin and
//! geo-restricted routes match by prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteCategory {
    /// Open to everyone.
    Public,
    /// Login and registration pages.
    Auth,
    /// Requires authentication.
    Protected,
    /// Requires the admin role.
    Admin,
    /// Unavailable from blocked countries.
    GeoRestricted,
    /// Matches no list.
    Uncategorized,
}

impl RouteCategory {
    /// Returns the kebab-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Auth => "auth",
            Self::Protected => "protected",
            Self::Admin => "admin",
            Self::GeoRestricted => "geo-restricted",
            Self::Uncategorized => "uncategorized",
        }
    }
}

impl fmt::Display for RouteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path prefixes the live middleware never evaluates.
const EXCLUDED_PREFIXES: &[&str] = &["/api", "/_waypoint", "/_next/static", "/_next/image"];

/// Static path lists for every route category.
///
/// # Example
///
/// ```
/// use waypoint_core::{RouteCategory, RouteTable};
///
/// let table = RouteTable::default();
/// assert_eq!(table.classify("/"), RouteCategory::Public);
/// assert_eq!(table.classify("/dashboard/stats"), RouteCategory::Protected);
/// assert_eq!(table.classify("/premium"), RouteCategory::GeoRestricted);
/// assert_eq!(table.classify("/contact"), RouteCategory::Uncategorized);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteTable {
    /// Exact-match public paths.
    #[serde(default = "default_public")]
    pub public: Vec<String>,
    /// Exact-match login/registration paths.
    #[serde(default = "default_auth")]
    pub auth: Vec<String>,
    /// Prefixes that require authentication.
    #[serde(default = "default_protected")]
    pub protected: Vec<String>,
    /// Prefixes that require the admin role.
    #[serde(default = "default_admin")]
    pub admin: Vec<String>,
    /// Prefixes unavailable from blocked countries.
    #[serde(default = "default_geo_restricted")]
    pub geo_restricted: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            public: default_public(),
            auth: default_auth(),
            protected: default_protected(),
            admin: default_admin(),
            geo_restricted: default_geo_restricted(),
        }
    }
}

fn owned(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| (*p).to_string()).collect()
}

fn default_public() -> Vec<String> {
    owned(&["/", "/about"])
}

fn default_auth() -> Vec<String> {
    owned(&["/login", "/register"])
}

fn default_protected() -> Vec<String> {
    owned(&["/dashboard", "/profile", "/settings"])
}

fn default_admin() -> Vec<String> {
    owned(&["/admin", "/admin/users", "/admin/settings"])
}

fn default_geo_restricted() -> Vec<String> {
    owned(&["/premium", "/exclusive"])
}

impl RouteTable {
    /// Returns true if `path` is exactly a public route.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|r| r == path)
    }

    /// Returns true if `path` is exactly a login/registration route.
    #[must_use]
    pub fn is_auth(&self, path: &str) -> bool {
        self.auth.iter().any(|r| r == path)
    }

    /// Returns true if `path` starts with a protected prefix.
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|r| path.starts_with(r.as_str()))
    }

    /// Returns true if `path` starts with an admin prefix.
    #[must_use]
    pub fn is_admin(&self, path: &str) -> bool {
        self.admin.iter().any(|r| path.starts_with(r.as_str()))
    }

    /// Returns true if `path` starts with a geo-restricted prefix.
    #[must_use]
    pub fn is_geo_restricted(&self, path: &str) -> bool {
        self.geo_restricted
            .iter()
            .any(|r| path.starts_with(r.as_str()))
    }

    /// Returns every category whose predicate matches `path`, in stage order.
    #[must_use]
    pub fn categories(&self, path: &str) -> Vec<RouteCategory> {
        let checks = [
            (RouteCategory::GeoRestricted, self.is_geo_restricted(path)),
            (RouteCategory::Public, self.is_public(path)),
            (RouteCategory::Auth, self.is_auth(path)),
            (RouteCategory::Protected, self.is_protected(path)),
            (RouteCategory::Admin, self.is_admin(path)),
        ];
        checks
            .into_iter()
            .filter_map(|(category, hit)| hit.then_some(category))
            .collect()
    }

    /// Classifies `path` into its first matching category.
    ///
    /// Categories are tried in stage order: geo-restricted, public, auth,
    /// protected, admin.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteCategory {
        self.categories(path)
            .first()
            .copied()
            .unwrap_or(RouteCategory::Uncategorized)
    }

    /// Returns configured entries that match more than one category.
    ///
    /// The pipeline checks each category independently, so an overlapping
    /// entry is evaluated by every matching stage.
    #[must_use]
    pub fn overlaps(&self) -> Vec<(String, Vec<RouteCategory>)> {
        let mut seen: Vec<&str> = Vec::new();
        let mut overlaps = Vec::new();

        let entries = self
            .public
            .iter()
            .chain(&self.auth)
            .chain(&self.protected)
            .chain(&self.admin)
            .chain(&self.geo_restricted);

        for entry in entries {
            if seen.contains(&entry.as_str()) {
                continue;
            }
            seen.push(entry);

            let categories = self.categories(entry);
            if categories.len() > 1 {
                overlaps.push((entry.clone(), categories));
            }
        }

        overlaps
    }

    /// Returns true if the live middleware should skip `path` entirely.
    ///
    /// ```
    /// use waypoint_core::RouteTable;
    ///
    /// assert!(RouteTable::is_excluded("/api/posts"));
    /// assert!(RouteTable::is_excluded("/images/logo.png"));
    /// assert!(!RouteTable::is_excluded("/dashboard"));
    /// ```
    #[must_use]
    pub fn is_excluded(path: &str) -> bool {
        EXCLUDED_PREFIXES.iter().any(|p| {
            path == *p || path.strip_prefix(p).is_some_and(|rest| rest.starts_with('/'))
        }) || path == "/favicon.ico"
            || path.ends_with(".png")
    }
}

/// An entry in the demo route catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoRoute {
    /// Route path.
    pub path: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Category shown next to the label.
    pub category: RouteCategory,
}

impl DemoRoute {
    /// Returns the demo route catalogue.
    #[must_use]
    pub fn catalogue() -> Vec<DemoRoute> {
        const fn route(path: &'static str, label: &'static str, category: RouteCategory) -> DemoRoute {
            DemoRoute { path, label, category }
        }

        vec![
            route("/", "Home", RouteCategory::Public),
            route("/about", "About", RouteCategory::Public),
            route("/login", "Login", RouteCategory::Auth),
            route("/register", "Register", RouteCategory::Auth),
            route("/dashboard", "Dashboard", RouteCategory::Protected),
            route("/profile", "Profile", RouteCategory::Protected),
            route("/settings", "Settings", RouteCategory::Protected),
            route("/admin", "Admin Panel", RouteCategory::Admin),
            route("/admin/users", "Admin/Users", RouteCategory::Admin),
            route("/premium", "Premium (Geo)", RouteCategory::GeoRestricted),
        ]
    }
}

//! Country lookups for the geolocation stage.
//!
//! Geo-IP resolution is simulated: callers pass a country code directly and
//! this module only supplies defaults and a coarse continent table.

/// Country assumed when a request carries no geo information.
pub const DEFAULT_COUNTRY: &str = "US";

/// Countries that cannot reach geo-restricted content by default.
pub const DEFAULT_BLOCKED_COUNTRIES: &[&str] = &["CN", "KP"];

/// Returns the continent name for a country code.
///
/// ```
/// use waypoint_core::geo::continent_of;
///
/// assert_eq!(continent_of("FR"), "Europe");
/// assert_eq!(continent_of("us"), "America");
/// assert_eq!(continent_of("ZZ"), "Unknown");
/// ```
#[must_use]
pub fn continent_of(country: &str) -> &'static str {
    match country.to_ascii_uppercase().as_str() {
        "FR" | "DE" | "GB" | "ES" | "IT" | "NL" | "BE" | "CH" | "PT" | "SE" | "PL" => "Europe",
        "US" | "CA" | "MX" | "BR" | "AR" | "CL" | "CO" => "America",
        "CN" | "KP" | "KR" | "JP" | "IN" | "SG" | "VN" | "TH" => "Asia",
        "NG" | "EG" | "ZA" | "KE" | "MA" | "SN" | "CI" => "Africa",
        "AU" | "NZ" => "Oceania",
        _ => "Unknown",
    }
}

/// Returns true if `country` is in `blocked`, ignoring case.
#[must_use]
pub fn is_blocked<S: AsRef<str>>(blocked: &[S], country: &str) -> bool {
    blocked
        .iter()
        .any(|c| c.as_ref().eq_ignore_ascii_case(country))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_blocked() {
        assert!(is_blocked(DEFAULT_BLOCKED_COUNTRIES, "CN"));
        assert!(is_blocked(DEFAULT_BLOCKED_COUNTRIES, "kp"));
        assert!(!is_blocked(DEFAULT_BLOCKED_COUNTRIES, "FR"));
    }

    #[test]
    fn test_continents() {
        assert_eq!(continent_of("CN"), "Asia");
        assert_eq!(continent_of("NG"), "Africa");
        assert_eq!(continent_of("AU"), "Oceania");
    }
}

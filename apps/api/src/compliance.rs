//! Jurisdiction Compliance Rule Engine — maps an extracted location to
//! pay-transparency jurisdictions.
//!
//! A fixed table, pure functions, no model calls. The table names the statute
//! so compensation suggestions can cite the actual legal requirement.

use crate::extraction::LocationFields;

/// US states with a statewide pay-transparency disclosure law.
const STATE_JURISDICTIONS: &[(&str, &str)] = &[
    ("CA", "California (SB 1162)"),
    ("CO", "Colorado (Equal Pay for Equal Work Act)"),
    ("CT", "Connecticut (PA 21-30)"),
    ("HI", "Hawaii (SB 1057)"),
    ("IL", "Illinois (HB 3129)"),
    ("MD", "Maryland (Wage Range Transparency Act)"),
    ("MN", "Minnesota (SF 3852)"),
    ("NY", "New York (S9427A)"),
    ("NV", "Nevada (SB 293)"),
    ("RI", "Rhode Island (Equal Pay Law)"),
    ("VT", "Vermont (H.704)"),
    ("WA", "Washington (Equal Pay and Opportunities Act)"),
    ("DC", "Washington, D.C. (Wage Transparency Omnibus Act)"),
];

/// Cities with a local ordinance, for postings in states not covered above.
const CITY_JURISDICTIONS: &[(&str, &str)] = &[
    ("new york", "New York City (Local Law 32)"),
    ("jersey city", "Jersey City (Ordinance 22-045)"),
    ("cincinnati", "Cincinnati (Ordinance 83-2019)"),
    ("toledo", "Toledo (Pay Equity Act)"),
];

/// Jurisdiction entry for remote roles based in the US: a US-remote posting is
/// reachable from every covered state, so disclosure applies.
pub const US_REMOTE_JURISDICTION: &str = "US remote (state pay-transparency coverage)";

/// Returns the pay-transparency jurisdictions this location falls under.
/// Empty means no disclosure requirement applies.
pub fn compute_jurisdictions(location: &LocationFields) -> Vec<String> {
    let mut jurisdictions = Vec::new();

    if let Some(state) = location.state.as_deref() {
        if let Some((_, name)) = STATE_JURISDICTIONS.iter().find(|(code, _)| *code == state) {
            jurisdictions.push((*name).to_string());
        }
    }

    if let Some(city) = location.city.as_deref() {
        let city_lower = city.to_lowercase();
        if let Some((_, name)) = CITY_JURISDICTIONS
            .iter()
            .find(|(match_city, _)| city_lower.contains(match_city))
        {
            let name = (*name).to_string();
            if !jurisdictions.contains(&name) {
                jurisdictions.push(name);
            }
        }
    }

    // Remote in the US (or remote with a US state extracted and no explicit
    // country) counts as covered.
    let us_based = matches!(location.country.as_deref(), Some("US"))
        || (location.country.is_none() && location.state.is_some());
    if location.remote && us_based {
        jurisdictions.push(US_REMOTE_JURISDICTION.to_string());
    }

    jurisdictions
}

/// Whether a full pay range must be disclosed for this location.
pub fn disclosure_required(jurisdictions: &[String]) -> bool {
    !jurisdictions.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(city: Option<&str>, state: Option<&str>, country: Option<&str>, remote: bool) -> LocationFields {
        LocationFields {
            city: city.map(str::to_string),
            state: state.map(str::to_string),
            country: country.map(str::to_string),
            remote,
            hybrid: false,
        }
    }

    #[test]
    fn test_covered_state_matches() {
        let juris = compute_jurisdictions(&location(Some("Denver"), Some("CO"), Some("US"), false));
        assert_eq!(juris.len(), 1);
        assert!(juris[0].contains("Colorado"));
    }

    #[test]
    fn test_remote_new_york_matches_state_city_and_remote() {
        let juris =
            compute_jurisdictions(&location(Some("New York"), Some("NY"), Some("US"), true));
        assert!(juris.iter().any(|j| j.contains("New York (")));
        assert!(juris.iter().any(|j| j.contains("Local Law 32")));
        assert!(juris.contains(&US_REMOTE_JURISDICTION.to_string()));
    }

    #[test]
    fn test_uncovered_state_is_empty() {
        let juris = compute_jurisdictions(&location(Some("Houston"), Some("TX"), Some("US"), false));
        assert!(juris.is_empty());
        assert!(!disclosure_required(&juris));
    }

    #[test]
    fn test_city_ordinance_in_uncovered_state() {
        let juris =
            compute_jurisdictions(&location(Some("Cincinnati"), Some("OH"), Some("US"), false));
        assert_eq!(juris.len(), 1);
        assert!(juris[0].contains("Cincinnati"));
    }

    #[test]
    fn test_remote_outside_us_not_covered() {
        let juris = compute_jurisdictions(&location(Some("Berlin"), None, Some("DE"), true));
        assert!(juris.is_empty());
    }

    #[test]
    fn test_remote_with_us_state_and_no_country_is_covered() {
        let juris = compute_jurisdictions(&location(None, Some("TX"), None, true));
        assert_eq!(juris, vec![US_REMOTE_JURISDICTION.to_string()]);
        assert!(disclosure_required(&juris));
    }
}

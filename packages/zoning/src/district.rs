//! Zoning district normalization.
//!
//! Registries spell district codes inconsistently: `"r7-2"`, `" R7 - 2 "`,
//! `"R7–2"` (en dash). This module canonicalizes them and derives the base
//! district (`R7-2` -> `R7`) used as the fallback lookup key.

use std::sync::LazyLock;

use nyc_zoning_models::{DistrictCandidates, NormalizedDistrict};
use regex::Regex;

/// Whitespace around a hyphen (`"R7 - 2"`).
static HYPHEN_SPACING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*").expect("valid regex"));

/// Runs of whitespace.
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Residence district prefix: `R` followed by digits.
static BASE_DISTRICT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^R[0-9]+").expect("valid regex"));

/// Canonicalizes a raw district string.
///
/// Returns `None` for absent or blank input. Non-residence districts
/// (`"C4-4"`, `"M1-1"`, `"PARK"`) normalize but have no base district.
#[must_use]
pub fn normalize(raw: Option<&str>) -> Option<NormalizedDistrict> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    let upper = raw.replace(['\u{2013}', '\u{2014}'], "-").to_uppercase();
    let dehyphenated = HYPHEN_SPACING_RE.replace_all(&upper, "-");
    let normalized = WHITESPACE_RE.replace_all(&dehyphenated, " ").to_string();

    let base_district = BASE_DISTRICT_RE
        .find(&normalized)
        .map(|m| m.as_str().to_string());

    Some(NormalizedDistrict {
        normalized,
        base_district,
    })
}

/// Normalizes every raw district mapped onto a lot, dropping blanks and
/// duplicates while keeping first-seen order.
#[must_use]
pub fn candidates<S: AsRef<str>>(raws: &[S]) -> DistrictCandidates {
    let mut out: DistrictCandidates = Vec::with_capacity(raws.len());
    for district in raws.iter().filter_map(|raw| normalize(Some(raw.as_ref()))) {
        if !out.iter().any(|d| d.normalized == district.normalized) {
            out.push(district);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> NormalizedDistrict {
        normalize(Some(raw)).unwrap()
    }

    #[test]
    fn uppercases_and_trims() {
        let d = norm("  r7-2 ");
        assert_eq!(d.normalized, "R7-2");
        assert_eq!(d.base_district.as_deref(), Some("R7"));
    }

    #[test]
    fn collapses_hyphen_spacing_and_dashes() {
        assert_eq!(norm("R7 - 2").normalized, "R7-2");
        assert_eq!(norm("R7\u{2013}2").normalized, "R7-2");
        assert_eq!(norm("C1 -  4").normalized, "C1-4");
    }

    #[test]
    fn derives_base_districts() {
        assert_eq!(norm("R10A").base_district.as_deref(), Some("R10"));
        assert_eq!(norm("R3-1").base_district.as_deref(), Some("R3"));
        assert_eq!(norm("R6").base_district.as_deref(), Some("R6"));
        assert_eq!(norm("R5D").base_district.as_deref(), Some("R5"));
    }

    #[test]
    fn non_residence_districts_have_no_base() {
        assert_eq!(norm("C4-4").base_district, None);
        assert_eq!(norm("M1-1").base_district, None);
        assert_eq!(norm("PARK").base_district, None);
    }

    #[test]
    fn absent_input_is_none() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("")), None);
        assert_eq!(normalize(Some("   ")), None);
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "r7-2",
            " R7 - 2 ",
            "R10A",
            "c4-4",
            "r6\u{2014}b",
            "M1-4/R7A",
            "R 6",
            "park",
            "R3-2  ",
        ] {
            let once = norm(raw);
            let twice = norm(&once.normalized);
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn candidates_dedupe_in_first_seen_order() {
        let list = candidates(&["R7A", "r6", " R7A ", "", "C4-4", "R6"]);
        let names: Vec<&str> = list.iter().map(|d| d.normalized.as_str()).collect();
        assert_eq!(names, vec!["R7A", "R6", "C4-4"]);
    }
}

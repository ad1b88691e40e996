//! Classifiers deriving categorical facts from raw parcel attributes.
//!
//! Each registry encodes these facts differently (building class codes,
//! corner markers, map layer labels). The functions here map them onto the
//! small enums the calculators branch on, and say when they had to guess.

use nyc_zoning_models::{BuildingType, LotType, TransitZone, TransitZoneQuery};

/// A classification together with whether it was defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified<T> {
    /// The classification.
    pub value: T,
    /// Whether `value` is a default rather than read from the data.
    pub inferred: bool,
    /// Explanation of the default, when `inferred` is set.
    pub assumption: Option<String>,
}

impl<T> Classified<T> {
    const fn confident(value: T) -> Self {
        Self {
            value,
            inferred: false,
            assumption: None,
        }
    }

    fn inferred(value: T, assumption: String) -> Self {
        Self {
            value,
            inferred: true,
            assumption: Some(assumption),
        }
    }
}

/// Derives the building type from the first letter of the building class.
///
/// `A*`/`B*` are one- and two-family dwellings; `C*`/`D*` are walk-up and
/// elevator apartment buildings. Anything else defaults to single- or
/// two-family, whose limits are generally the more restrictive.
#[must_use]
pub fn classify_building_type(building_class: Option<&str>) -> Classified<BuildingType> {
    let class = building_class.map(str::trim).filter(|c| !c.is_empty());

    let Some(class) = class else {
        return Classified::inferred(
            BuildingType::SingleOrTwoFamily,
            "Building class unknown; assumed single- or two-family building".to_string(),
        );
    };

    match class.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('A' | 'B') => Classified::confident(BuildingType::SingleOrTwoFamily),
        Some('C' | 'D') => Classified::confident(BuildingType::MultipleDwelling),
        _ => Classified::inferred(
            BuildingType::SingleOrTwoFamily,
            format!(
                "Building class {class} is not residential (A, B, C, D); assumed single- or \
                 two-family building"
            ),
        ),
    }
}

/// Derives the lot type from the geocoder's corner marker.
///
/// A non-empty marker is a corner lot. An empty or missing marker on a
/// geocoder record is a confident interior/through classification. Only
/// when no geocoder record existed at all is the result marked inferred.
#[must_use]
pub fn classify_lot_type(corner_code: Option<&str>, record_present: bool) -> Classified<LotType> {
    let has_marker = corner_code.is_some_and(|code| !code.trim().is_empty());

    if has_marker {
        return Classified::confident(LotType::Corner);
    }

    if record_present {
        Classified::confident(LotType::InteriorOrThrough)
    } else {
        Classified::inferred(
            LotType::InteriorOrThrough,
            "No geocoder record for this lot; assumed interior or through lot".to_string(),
        )
    }
}

/// Maps the outcome of a transit-zone spatial query to a category.
///
/// A successful query with no intersecting polygon places the lot beyond
/// the Greater Transit Zone. A failed query, or one that returned only
/// labels this function does not recognize, is [`TransitZone::Unknown`].
/// With several labels the first recognized one wins.
#[must_use]
pub fn classify_transit_zone(query: &TransitZoneQuery) -> TransitZone {
    match query {
        TransitZoneQuery::Matched { labels } => {
            let zone = labels.iter().find_map(|label| TransitZone::from_label(label));
            if zone.is_none() {
                log::warn!("Unrecognized transit zone labels: {labels:?}");
            }
            zone.unwrap_or(TransitZone::Unknown)
        }
        TransitZoneQuery::NoFeatures => TransitZone::BeyondGtz,
        TransitZoneQuery::Failed { message } => {
            log::warn!("Transit zone lookup failed: {message}");
            TransitZone::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_classes() {
        assert_eq!(
            classify_building_type(Some("A1")).value,
            BuildingType::SingleOrTwoFamily
        );
        assert_eq!(
            classify_building_type(Some("b2")).value,
            BuildingType::SingleOrTwoFamily
        );
        assert_eq!(
            classify_building_type(Some("C0")).value,
            BuildingType::MultipleDwelling
        );
        assert_eq!(
            classify_building_type(Some("D4")).value,
            BuildingType::MultipleDwelling
        );
        assert!(!classify_building_type(Some("D4")).inferred);
    }

    #[test]
    fn unknown_building_class_defaults_with_note() {
        for class in [None, Some(""), Some("K1"), Some("V0")] {
            let classified = classify_building_type(class);
            assert_eq!(classified.value, BuildingType::SingleOrTwoFamily);
            assert!(classified.inferred);
            assert!(classified.assumption.is_some());
        }
    }

    #[test]
    fn corner_marker_means_corner() {
        let classified = classify_lot_type(Some("SE"), true);
        assert_eq!(classified.value, LotType::Corner);
        assert!(!classified.inferred);
    }

    #[test]
    fn missing_marker_is_confident_interior() {
        for code in [None, Some(""), Some("  ")] {
            let classified = classify_lot_type(code, true);
            assert_eq!(classified.value, LotType::InteriorOrThrough);
            assert!(!classified.inferred);
            assert_eq!(classified.assumption, None);
        }
    }

    #[test]
    fn missing_record_is_inferred() {
        let classified = classify_lot_type(None, false);
        assert_eq!(classified.value, LotType::InteriorOrThrough);
        assert!(classified.inferred);
    }

    #[test]
    fn transit_zone_outcomes() {
        let matched = |labels: &[&str]| TransitZoneQuery::Matched {
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        };

        assert_eq!(
            classify_transit_zone(&matched(&["Inner Transit Zone"])),
            TransitZone::Inner
        );
        assert_eq!(
            classify_transit_zone(&matched(&["Something else", "Outer Transit Zone"])),
            TransitZone::Outer
        );
        assert_eq!(
            classify_transit_zone(&matched(&["Long Island City"])),
            TransitZone::ManhattanCoreLic
        );
        assert_eq!(
            classify_transit_zone(&matched(&["Zone 7"])),
            TransitZone::Unknown
        );
        assert_eq!(
            classify_transit_zone(&TransitZoneQuery::NoFeatures),
            TransitZone::BeyondGtz
        );
        assert_eq!(
            classify_transit_zone(&TransitZoneQuery::Failed {
                message: "timeout".to_string()
            }),
            TransitZone::Unknown
        );
    }
}

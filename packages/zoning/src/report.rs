//! Assembles the full zoning report for one parcel.

use nyc_zoning_models::{
    ConstraintResult, DistrictTier, ParcelFacts, TransitZone, ZoningFlags, ZoningResolutionResult,
};

use crate::calculators::{
    EvaluationContext, density, far, height, lot_coverage, parking, yards,
};
use crate::classify::{classify_building_type, classify_lot_type};
use crate::derived::aggregate;
use crate::district;
use crate::tables::tables;

/// Evaluates every constraint family for a parcel.
///
/// Facts are sanitized first, so negative or non-finite numbers are
/// treated as unknown. The function never fails: anything the engine
/// cannot decide is reported as unsupported, conditional, or flagged for
/// review.
#[must_use]
pub fn evaluate(facts: &ParcelFacts) -> ZoningResolutionResult {
    let (facts, sanitize_notes) = facts.sanitized();
    let districts = district::candidates(&facts.zoning_districts);

    let building_type = classify_building_type(facts.building_class.as_deref());
    let lot_type = classify_lot_type(facts.corner_code.as_deref(), facts.geocoder_record_present);

    log::debug!(
        "Evaluating {:?}: districts {:?}, {} / {} / {}",
        facts.bbl.map(|bbl| bbl.to_string()),
        districts
            .iter()
            .map(|d| d.normalized.as_str())
            .collect::<Vec<_>>(),
        building_type.value,
        lot_type.value,
        facts.transit_zone,
    );

    let ctx = EvaluationContext {
        facts: &facts,
        districts: &districts,
        building_type: building_type.value,
        lot_type: lot_type.value,
        tables: tables(),
    };

    let far = far::calculate(&ctx);
    let lot_coverage = lot_coverage::calculate(&ctx);
    let min_base_height = height::min_base_height(&ctx);
    let height_envelope = height::envelope(&ctx);
    let front_yard = yards::front(&ctx);
    let side_yard = yards::side(&ctx);
    let rear_yard = yards::rear(&ctx);

    let derived = aggregate(&facts, &far, &lot_coverage);
    let max_units = derived
        .values
        .max_buildable_floor_area_sqft
        .map(density::max_dwelling_units);
    let density = density::calculate(&ctx, derived.values.max_buildable_floor_area_sqft);
    let parking = parking::calculate(&ctx, max_units);

    let mut assumptions = Assumptions::default();
    assumptions.extend(sanitize_notes);
    assumptions.extend(building_type.assumption.clone());
    assumptions.extend(lot_type.assumption.clone());

    let constraints: [&ConstraintResult; 9] = [
        &far,
        &lot_coverage,
        &min_base_height,
        &height_envelope,
        &density,
        &parking,
        &front_yard,
        &side_yard,
        &rear_yard,
    ];
    for result in constraints {
        assumptions.extend(result.assumptions.iter().cloned());
    }
    assumptions.extend(derived.assumptions);

    if !facts.overlays.is_empty() {
        assumptions.push(format!(
            "Commercial overlay ({}) rules were not evaluated",
            facts.overlays.join(", ")
        ));
    }
    if !facts.special_districts.is_empty() {
        assumptions.push(format!(
            "Special purpose district ({}) rules were not evaluated and may modify every result",
            facts.special_districts.join(", ")
        ));
    }
    if let Some(flood_zone) = &facts.flood_zone {
        assumptions.push(format!(
            "Lot is in flood zone {flood_zone}; flood resilience rules were not evaluated"
        ));
    }

    let eligible_site_not_evaluated = !lot_coverage.is_unsupported()
        && districts.iter().find_map(nyc_zoning_models::NormalizedDistrict::tier)
            == Some(DistrictTier::MediumHighDensity);

    let flags = ZoningFlags {
        has_overlay: !facts.overlays.is_empty(),
        has_special_district: !facts.special_districts.is_empty(),
        multi_district_lot: districts.len() > 1,
        building_type_inferred: building_type.inferred,
        lot_type_inferred: lot_type.inferred,
        eligible_site_not_evaluated,
        base_district_fallback_used: constraints
            .iter()
            .any(|result| result.assumptions.iter().any(|a| a.contains("base district"))),
        transit_zone_unresolved: matches!(
            facts.transit_zone,
            TransitZone::Unknown | TransitZone::ManhattanCoreLic
        ),
        in_flood_zone: facts.flood_zone.is_some(),
        requires_manual_review: constraints.iter().any(|r| r.requires_manual_review),
    };

    ZoningResolutionResult {
        bbl: facts.bbl,
        building_type: building_type.value,
        lot_type: lot_type.value,
        transit_zone: facts.transit_zone,
        far,
        lot_coverage,
        min_base_height,
        height_envelope,
        density,
        parking,
        front_yard,
        side_yard,
        rear_yard,
        derived: derived.values,
        assumptions: assumptions.into_vec(),
        flags,
        districts,
    }
}

/// Ordered assumption list that drops duplicates.
#[derive(Default)]
struct Assumptions(Vec<String>);

impl Assumptions {
    fn push(&mut self, assumption: String) {
        if !self.0.contains(&assumption) {
            self.0.push(assumption);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Extend<String> for Assumptions {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for assumption in iter {
            self.push(assumption);
        }
    }
}

#[cfg(test)]
mod tests {
    use nyc_zoning_models::{BuildingType, ConstraintKind, LotType};

    use super::*;

    fn facts(districts: &[&str]) -> ParcelFacts {
        ParcelFacts {
            zoning_districts: districts.iter().map(|d| (*d).to_string()).collect(),
            ..ParcelFacts::default()
        }
    }

    #[test]
    fn scenario_r6_single_family() {
        let result = evaluate(&ParcelFacts {
            lot_area_sqft: Some(4_000.0),
            building_class: Some("A1".to_string()),
            ..facts(&["R6"])
        });

        assert_eq!(result.building_type, BuildingType::SingleOrTwoFamily);
        assert!(!result.flags.building_type_inferred);
        assert_eq!(result.far.kind(), ConstraintKind::Fixed);
        assert_eq!(result.far.fixed_scalar(), Some(2.2));
        assert_eq!(result.lot_coverage.fixed_scalar(), Some(60.0));
        assert!(
            (result.derived.max_buildable_floor_area_sqft.unwrap() - 8_800.0).abs() < 1e-6
        );
        assert!((result.derived.max_footprint_sqft.unwrap() - 2_400.0).abs() < 1e-6);
        assert!(result.flags.eligible_site_not_evaluated);
        assert_eq!(result.density.kind(), ConstraintKind::NotApplicable);
        assert_eq!(result.parking.kind(), ConstraintKind::NotApplicable);
    }

    #[test]
    fn scenario_r7_2_without_corner_marker() {
        let result = evaluate(&facts(&["R7-2"]));

        assert_eq!(result.lot_type, LotType::InteriorOrThrough);
        assert!(!result.flags.lot_type_inferred);
        assert_eq!(result.front_yard.kind(), ConstraintKind::Fixed);
        assert_eq!(result.front_yard.fixed_scalar(), Some(0.0));
        assert_eq!(result.front_yard.source_section, "ZR 23-322");
        assert!(result.flags.base_district_fallback_used);
    }

    #[test]
    fn scenario_unknown_transit_zone() {
        let result = evaluate(&ParcelFacts {
            lot_area_sqft: Some(10_000.0),
            building_class: Some("D1".to_string()),
            transit_zone: TransitZone::Unknown,
            ..facts(&["R7A"])
        });

        let citations: Vec<&str> = result
            .parking
            .candidates()
            .iter()
            .map(|c| c.citation.as_str())
            .collect();
        assert_eq!(citations, vec!["ZR 25-21", "ZR 25-22", "ZR 25-23"]);
        assert!(result.parking.requires_manual_review);
        assert!(
            result
                .assumptions
                .iter()
                .any(|a| a.contains("all parking regimes"))
        );
        assert!(result.flags.transit_zone_unresolved);
        assert!(result.flags.requires_manual_review);
    }

    #[test]
    fn missing_geocoder_record_infers_lot_type() {
        let result = evaluate(&ParcelFacts {
            geocoder_record_present: false,
            ..facts(&["R6"])
        });

        assert_eq!(result.lot_type, LotType::InteriorOrThrough);
        assert!(result.flags.lot_type_inferred);
        assert!(
            result
                .assumptions
                .iter()
                .any(|a| a.starts_with("No geocoder record"))
        );
    }

    #[test]
    fn multi_district_is_conservative() {
        let result = evaluate(&ParcelFacts {
            lot_area_sqft: Some(1_000.0),
            ..facts(&["R6", "R8"])
        });
        assert_eq!(result.far.resolved_scalar(), Some(2.2));
        assert!(result.far.requires_manual_review);
        assert!(result.flags.multi_district_lot);
        assert!(
            (result.derived.max_buildable_floor_area_sqft.unwrap() - 2_200.0).abs() < 1e-6
        );
    }

    #[test]
    fn no_district_makes_everything_unsupported() {
        let result = evaluate(&ParcelFacts::default());
        for (name, constraint) in result.constraints() {
            assert!(constraint.is_unsupported(), "{name} was {}", constraint.kind());
        }
        assert_eq!(result.derived.max_buildable_floor_area_sqft, None);
    }

    #[test]
    fn invalid_numbers_are_sanitized() {
        let result = evaluate(&ParcelFacts {
            lot_area_sqft: Some(-4_000.0),
            ..facts(&["R6"])
        });
        assert_eq!(result.derived.max_buildable_floor_area_sqft, None);
        assert!(result.assumptions.iter().any(|a| a.contains("Ignored invalid lot area")));
    }

    #[test]
    fn overlays_and_special_districts_are_flagged() {
        let result = evaluate(&ParcelFacts {
            overlays: vec!["C1-3".to_string()],
            special_districts: vec!["SRD".to_string()],
            flood_zone: Some("AE".to_string()),
            ..facts(&["R5"])
        });
        assert!(result.flags.has_overlay);
        assert!(result.flags.has_special_district);
        assert!(result.flags.in_flood_zone);
        assert!(result.assumptions.iter().any(|a| a.contains("C1-3")));
        assert!(result.assumptions.iter().any(|a| a.contains("SRD")));
        assert!(!result.flags.eligible_site_not_evaluated);
    }

    #[test]
    fn assumptions_are_deduplicated() {
        let result = evaluate(&facts(&["R7-2"]));
        let mut sorted = result.assumptions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), result.assumptions.len());
    }

    #[test]
    fn multiple_dwelling_gets_density_and_parking() {
        let result = evaluate(&ParcelFacts {
            lot_area_sqft: Some(5_000.0),
            building_class: Some("C1".to_string()),
            transit_zone: TransitZone::Outer,
            ..facts(&["R7A"])
        });
        // 5,000 x 4.0 = 20,000 sq ft / 680 = 29.41 -> 29 units; 29 x 15% = 4.35 -> 4,
        // within the 10 space waiver.
        assert_eq!(result.density.kind(), ConstraintKind::Toggle);
        assert_eq!(
            result.density.scenarios()[0]
                .quantity
                .as_ref()
                .and_then(nyc_zoning_models::Quantity::as_scalar),
            Some(29.0)
        );
        assert_eq!(result.parking.fixed_scalar(), Some(0.0));
    }

    #[test]
    fn serializes_to_json() {
        let result = evaluate(&ParcelFacts {
            lot_area_sqft: Some(4_000.0),
            ..facts(&["R6"])
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["far"]["value"]["kind"], "fixed");
        assert_eq!(json["minBaseHeight"]["value"]["kind"], "conditional");
    }
}

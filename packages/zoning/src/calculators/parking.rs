//! Accessory off-street parking for dwelling units (ZR 25-21, 25-22,
//! 25-23).
//!
//! The regime is chosen by transit zone. When the zone does not map onto
//! a single regime every plausible regime is returned side by side.

use nyc_zoning_models::{
    Candidate, ConstraintResult, ConstraintValue, NormalizedDistrict, Quantity, TransitZone, Unit,
};

use super::EvaluationContext;
use crate::tables::{Lookup, ParkingEntry, ParkingRegime, ParkingTables, lookup};

/// Lots with this much street frontage or less may have their parking
/// requirement waived entirely.
const NARROW_FRONTAGE_FT: f64 = 25.0;

/// Rounds half up: 4.5 is 5, 4.49 is 4.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_half_up(raw: f64) -> u32 {
    if raw <= 0.0 {
        return 0;
    }
    (raw + 0.5 + 1e-9).floor() as u32
}

/// Applies a regime's waiver: requirements at or below `waiver_max`
/// spaces drop to zero.
#[must_use]
pub const fn apply_waiver(rounded: u32, waiver_max: u32) -> u32 {
    if rounded <= waiver_max { 0 } else { rounded }
}

/// Returns the regimes that may govern a lot in `zone`.
#[must_use]
pub fn regimes_for(zone: TransitZone, tables: &ParkingTables) -> Vec<&ParkingRegime> {
    match zone {
        TransitZone::Inner => vec![&tables.inner],
        TransitZone::Outer => vec![&tables.outer],
        TransitZone::BeyondGtz => vec![&tables.beyond_gtz],
        TransitZone::ManhattanCoreLic => vec![&tables.inner, &tables.outer],
        TransitZone::Unknown => vec![&tables.inner, &tables.outer, &tables.beyond_gtz],
    }
}

/// One regime's requirement for a lot.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeRequirement {
    /// Spaces per 100 units after any small-lot modifier.
    pub percent: f64,
    /// `units x percent / 100`.
    pub raw_spaces: f64,
    /// `raw_spaces` rounded half up.
    pub rounded_spaces: u32,
    /// Spaces required after the waiver.
    pub required_spaces: u32,
    /// Whether a small-lot modifier replaced the base percentage.
    pub small_lot_modifier_applied: bool,
}

/// Computes one regime's requirement.
#[must_use]
pub fn requirement(
    regime_entry: &ParkingEntry,
    units: u32,
    lot_area_sqft: Option<f64>,
) -> RegimeRequirement {
    let (percent, modifier) = regime_entry.percent_for_lot(lot_area_sqft);
    let raw_spaces = f64::from(units) * percent / 100.0;
    let rounded_spaces = round_half_up(raw_spaces);

    RegimeRequirement {
        percent,
        raw_spaces,
        rounded_spaces,
        required_spaces: apply_waiver(rounded_spaces, regime_entry.waiver_max),
        small_lot_modifier_applied: modifier.is_some(),
    }
}

/// Computes the parking requirement for the lot's dwelling units.
///
/// The unit count is the dwelling unit cap derived from the maximum
/// buildable floor area. Without one the existing unit count is used.
#[must_use]
pub fn calculate(ctx: &EvaluationContext<'_>, max_dwelling_units: Option<u32>) -> ConstraintResult {
    let tables = &ctx.tables.parking;
    let all_sections = format!(
        "{} / {} / {}",
        tables.inner.section, tables.outer.section, tables.beyond_gtz.section
    );

    let primary = match ctx.primary_residence() {
        Ok(primary) => primary,
        Err(reason) => return ConstraintResult::unsupported(reason, all_sections),
    };
    let district = primary.district;

    if !ctx.multiple_dwelling_rules_apply() {
        return ConstraintResult::not_applicable(
            "Parking requirements are evaluated for multiple dwellings or buildings with more \
             than two units",
            all_sections,
        );
    }

    let mut assumptions = Vec::new();
    let units = if let Some(units) = max_dwelling_units {
        units
    } else if let Some(existing) = ctx.facts.existing_units {
        assumptions.push(format!(
            "Maximum dwelling units unknown; parking computed for the {existing} existing units"
        ));
        existing
    } else {
        return ConstraintResult::unsupported(
            "Neither the maximum nor the existing dwelling unit count is known",
            all_sections,
        );
    };

    let zone = ctx.facts.transit_zone;
    let regimes = regimes_for(zone, tables);
    let RegimeEvaluation {
        candidates,
        mut notes,
        small_lot_unchecked,
    } = evaluate_regimes(ctx, district, &regimes, units, &mut assumptions);

    let mut result = match candidates.as_slice() {
        [] => {
            return ConstraintResult::unsupported(notes.join("; "), all_sections);
        }
        [(regime, candidate)] if regimes.len() == 1 => ConstraintResult::new(
            ConstraintValue::Fixed {
                quantity: candidate.quantity.clone(),
            },
            regime.section.clone(),
        )
        .with_url(regime.url.clone()),
        _ => {
            let sections = candidates
                .iter()
                .map(|(regime, _)| regime.section.as_str())
                .collect::<Vec<_>>()
                .join(" / ");
            ConstraintResult::new(
                ConstraintValue::Candidates {
                    candidates: candidates.iter().map(|(_, c)| c.clone()).collect(),
                    controlling: None,
                },
                sections,
            )
            .with_manual_review(true)
        }
    };

    match zone {
        TransitZone::Unknown => {
            assumptions.push(
                "Transit zone unknown; all parking regimes are included pending manual \
                 verification"
                    .to_string(),
            );
        }
        TransitZone::ManhattanCoreLic => {
            notes.push(
                "Manhattan Core and Long Island City parking rules are not evaluated; the inner \
                 and outer transit zone regimes are shown for reference"
                    .to_string(),
            );
            result = result.with_manual_review(true);
        }
        TransitZone::Inner | TransitZone::Outer | TransitZone::BeyondGtz => {}
    }

    if small_lot_unchecked {
        result = result.with_manual_review(true);
    }

    if ctx
        .facts
        .lot_frontage_ft
        .is_some_and(|frontage| frontage <= NARROW_FRONTAGE_FT)
    {
        notes.push(format!(
            "Lots with {NARROW_FRONTAGE_FT:.0} ft of frontage or less may qualify for a full \
             parking waiver; not applied"
        ));
        result = result.with_manual_review(true);
    }

    result.notes.extend(notes);
    for assumption in assumptions {
        if !result.assumptions.contains(&assumption) {
            result.assumptions.push(assumption);
        }
    }

    ctx.with_multi_district_note(result, district)
}

struct RegimeEvaluation<'t> {
    candidates: Vec<(&'t ParkingRegime, Candidate)>,
    notes: Vec<String>,
    /// A regime has small-lot reductions but the lot area is unknown.
    small_lot_unchecked: bool,
}

fn evaluate_regimes<'t>(
    ctx: &EvaluationContext<'_>,
    district: &NormalizedDistrict,
    regimes: &[&'t ParkingRegime],
    units: u32,
    assumptions: &mut Vec<String>,
) -> RegimeEvaluation<'t> {
    let mut candidates = Vec::with_capacity(regimes.len());
    let mut notes = Vec::new();
    let mut small_lot_unchecked = false;

    for regime in regimes {
        let found = lookup(&regime.districts, district, "parking");
        let entry = match &found {
            Lookup::Exact { entry, .. } | Lookup::Base { entry, .. } => *entry,
            Lookup::Missing { reason } => {
                notes.push(format!("{}: {reason}", regime.section));
                continue;
            }
        };
        if let Some(assumption) = found
            .assumption()
            .filter(|assumption| !assumptions.iter().any(|a| a == assumption))
        {
            assumptions.push(assumption.to_string());
        }

        let lot_area = ctx.facts.positive_lot_area();
        let small_lot_limit = entry
            .small_lots
            .iter()
            .map(|modifier| modifier.max_lot_area_sqft)
            .reduce(f64::max);
        if let Some(limit) = small_lot_limit.filter(|_| lot_area.is_none()) {
            notes.push(format!(
                "{}: lot area unknown; small lot reductions for lots of {limit:.0} sq ft or \
                 less were not applied",
                regime.section
            ));
            small_lot_unchecked = true;
        }

        let req = requirement(entry, units, lot_area);
        log::debug!("{} parking for {units} units: {req:?}", regime.section);

        if req.small_lot_modifier_applied {
            notes.push(format!(
                "{}: small lot modifier applied ({}% of units)",
                regime.section, req.percent
            ));
        }

        let waived = if req.required_spaces < req.rounded_spaces {
            format!(", waived (at most {} spaces)", entry.waiver_max)
        } else {
            String::new()
        };

        candidates.push((
            *regime,
            Candidate {
                quantity: Quantity::scalar(f64::from(req.required_spaces), Unit::ParkingSpaces),
                condition: format!(
                    "{}: {units} units x {}% = {:.2}, rounded to {}{waived}",
                    regime.label, req.percent, req.raw_spaces, req.rounded_spaces
                ),
                citation: regime.section.clone(),
            },
        ));
    }

    RegimeEvaluation {
        candidates,
        notes,
        small_lot_unchecked,
    }
}

#[cfg(test)]
mod tests {
    use nyc_zoning_models::{BuildingType, ConstraintKind};

    use super::*;
    use crate::calculators::test_support::Fixture;
    use crate::tables::tables;

    fn multiple_dwelling(districts: &[&str], zone: TransitZone) -> Fixture {
        let mut fixture = Fixture::new(districts);
        fixture.building_type = BuildingType::MultipleDwelling;
        fixture.facts.transit_zone = zone;
        fixture
    }

    #[test]
    fn half_up_rounding() {
        assert_eq!(round_half_up(4.5), 5);
        assert_eq!(round_half_up(4.49), 4);
        assert_eq!(round_half_up(0.0), 0);
    }

    #[test]
    fn waiver() {
        assert_eq!(apply_waiver(3, 5), 0);
        assert_eq!(apply_waiver(5, 5), 0);
        assert_eq!(apply_waiver(8, 5), 8);
    }

    #[test]
    fn percent_applied_before_rounding() {
        let entry = &tables().parking.outer.districts["R7"];
        // 30 units x 15% = 4.5 -> 5, within the 10 space waiver.
        let req = requirement(entry, 30, None);
        assert!((req.raw_spaces - 4.5).abs() < 1e-9);
        assert_eq!(req.rounded_spaces, 5);
        assert_eq!(req.required_spaces, 0);

        let req = requirement(entry, 100, None);
        assert_eq!(req.rounded_spaces, 15);
        assert_eq!(req.required_spaces, 15);
    }

    #[test]
    fn small_lot_modifier_replaces_percent() {
        let entry = &tables().parking.beyond_gtz.districts["R6"];
        let req = requirement(entry, 40, Some(12_000.0));
        assert!(req.small_lot_modifier_applied);
        assert_eq!(req.rounded_spaces, 12);

        let req = requirement(entry, 40, Some(9_000.0));
        assert_eq!(req.required_spaces, 0);
    }

    #[test]
    fn single_regime_is_fixed() {
        let fixture = multiple_dwelling(&["R6"], TransitZone::Outer);
        let result = calculate(&fixture.ctx(), Some(40));
        assert_eq!(result.kind(), ConstraintKind::Fixed);
        assert_eq!(result.fixed_scalar(), Some(10.0));
        assert_eq!(result.source_section, "ZR 25-22");
        assert!(!result.requires_manual_review);
    }

    #[test]
    fn unknown_zone_lists_all_regimes() {
        let fixture = multiple_dwelling(&["R6"], TransitZone::Unknown);
        let result = calculate(&fixture.ctx(), Some(40));
        assert_eq!(result.kind(), ConstraintKind::Candidates);

        let citations: Vec<&str> = result
            .candidates()
            .iter()
            .map(|c| c.citation.as_str())
            .collect();
        assert_eq!(citations, vec!["ZR 25-21", "ZR 25-22", "ZR 25-23"]);
        assert!(result.requires_manual_review);
        assert!(
            result
                .assumptions
                .iter()
                .any(|a| a.contains("all parking regimes"))
        );
    }

    #[test]
    fn manhattan_core_lists_inner_and_outer() {
        let fixture = multiple_dwelling(&["R8"], TransitZone::ManhattanCoreLic);
        let result = calculate(&fixture.ctx(), Some(100));
        assert_eq!(result.candidates().len(), 2);
        assert!(result.requires_manual_review);
        assert!(result.notes.iter().any(|n| n.contains("Manhattan Core")));
    }

    #[test]
    fn narrow_frontage_adds_override_note() {
        let mut fixture = multiple_dwelling(&["R6"], TransitZone::Outer);
        fixture.facts.lot_frontage_ft = Some(25.0);
        let result = calculate(&fixture.ctx(), Some(40));
        assert_eq!(result.fixed_scalar(), Some(10.0));
        assert!(result.requires_manual_review);
        assert!(result.notes.iter().any(|n| n.contains("full parking waiver")));
    }

    #[test]
    fn unknown_lot_area_leaves_small_lot_reduction_open() {
        let mut fixture = multiple_dwelling(&["R6"], TransitZone::BeyondGtz);
        fixture.facts.existing_units = Some(40);
        let result = calculate(&fixture.ctx(), None);

        // 40 x 50% = 20 spaces before any small-lot reduction.
        assert_eq!(result.fixed_scalar(), Some(20.0));
        assert!(result.requires_manual_review);
        assert!(
            result
                .notes
                .iter()
                .any(|n| n.contains("lot area unknown") && n.contains("15000 sq ft"))
        );

        fixture.facts.lot_area_sqft = Some(8_000.0);
        let result = calculate(&fixture.ctx(), None);
        assert_eq!(result.fixed_scalar(), Some(0.0));
        assert!(!result.notes.iter().any(|n| n.contains("lot area unknown")));
    }

    #[test]
    fn falls_back_to_existing_units() {
        let mut fixture = multiple_dwelling(&["R6"], TransitZone::Outer);
        fixture.facts.existing_units = Some(40);
        let result = calculate(&fixture.ctx(), None);
        assert_eq!(result.fixed_scalar(), Some(10.0));
        assert!(result.assumptions.iter().any(|a| a.contains("40 existing")));
    }

    #[test]
    fn unit_count_required() {
        let fixture = multiple_dwelling(&["R6"], TransitZone::Outer);
        assert!(calculate(&fixture.ctx(), None).is_unsupported());
    }

    #[test]
    fn single_family_is_not_applicable() {
        let mut fixture = Fixture::new(&["R6"]);
        fixture.facts.transit_zone = TransitZone::Outer;
        let result = calculate(&fixture.ctx(), Some(10));
        assert_eq!(result.kind(), ConstraintKind::NotApplicable);
    }

    #[test]
    fn base_fallback_adds_one_assumption_across_regimes() {
        let fixture = multiple_dwelling(&["R7-2"], TransitZone::Unknown);
        let result = calculate(&fixture.ctx(), Some(100));
        let fallbacks = result
            .assumptions
            .iter()
            .filter(|a| a.contains("base district"))
            .count();
        assert_eq!(fallbacks, 1);
    }
}

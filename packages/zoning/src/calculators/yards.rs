//! Front, side, and rear yards (ZR 23-32x, 23-33x, 23-342).
//!
//! Yard rules carry many site-specific modifiers (corner lot reductions,
//! line-up rules, facade articulation). They are listed as notes and the
//! results are flagged for review rather than computed.

use nyc_zoning_models::{
    ConstraintResult, ConstraintValue, DistrictTier, LotType, Quantity, Unit,
};

use super::{EvaluationContext, with_lookup_assumption};
use crate::tables::{Lookup, lookup};

fn feet(value: f64) -> ConstraintValue {
    ConstraintValue::Fixed {
        quantity: Quantity::scalar(value, Unit::Feet),
    }
}

/// Minimum front yard depth.
#[must_use]
pub fn front(ctx: &EvaluationContext<'_>) -> ConstraintResult {
    let table = &ctx.tables.yards.front;

    let primary = match ctx.primary_residence() {
        Ok(primary) => primary,
        Err(reason) => {
            return ConstraintResult::unsupported(reason, table.low_density_section.clone());
        }
    };
    let district = primary.district;

    let result = match primary.tier {
        DistrictTier::MediumHighDensity => ConstraintResult::new(
            feet(table.medium_high_density_ft),
            table.medium_high_density_section.clone(),
        )
        .with_url(table.medium_high_density_url.clone())
        .with_note("No front yard is required in R6 through R12 districts"),
        DistrictTier::LowDensity => {
            let found = lookup(&table.districts, district, "front yard");
            let Some(depth) = found.entry().copied() else {
                return missing(found, table.low_density_section.clone());
            };
            let mut result =
                ConstraintResult::new(feet(depth), table.low_density_section.clone())
                    .with_url(table.low_density_url.clone())
                    .with_note(
                        "Front yard line-up rules may require matching an adjacent front yard",
                    )
                    .with_manual_review(true);
            if ctx.lot_type == LotType::Corner {
                result = result.with_note(
                    "Corner lots need a front yard on each street frontage; reductions are not \
                     evaluated",
                );
            }
            with_lookup_assumption(result, found.assumption())
        }
    };

    ctx.with_multi_district_note(result, district)
}

/// Minimum side yard width.
#[must_use]
pub fn side(ctx: &EvaluationContext<'_>) -> ConstraintResult {
    let table = &ctx.tables.yards.side;

    let primary = match ctx.primary_residence() {
        Ok(primary) => primary,
        Err(reason) => {
            return ConstraintResult::unsupported(reason, table.low_density_section.clone());
        }
    };
    let district = primary.district;

    let result = match primary.tier {
        DistrictTier::MediumHighDensity => ConstraintResult::new(
            feet(
                table
                    .medium_high_density
                    .for_building(ctx.building_type),
            ),
            table.medium_high_density_section.clone(),
        )
        .with_url(table.medium_high_density_url.clone())
        .with_note("A side yard that is provided must be at least 8 ft wide"),
        DistrictTier::LowDensity => {
            let found = lookup(&table.districts, district, "side yard");
            let Some(entry) = found.entry() else {
                return missing(found, table.low_density_section.clone());
            };
            let result = ConstraintResult::new(
                feet(entry.for_building(ctx.building_type)),
                table.low_density_section.clone(),
            )
            .with_url(table.low_density_url.clone())
            .with_note(
                "Side yard width depends on whether the building is detached, semi-detached, or \
                 attached, and on lot width",
            );
            with_lookup_assumption(result, found.assumption())
        }
    };

    ctx.with_multi_district_note(result.with_manual_review(true), district)
}

/// Minimum rear yard depth. The baseline always applies; narrow and
/// shallow lot modifiers are noted but never applied.
#[must_use]
pub fn rear(ctx: &EvaluationContext<'_>) -> ConstraintResult {
    let table = &ctx.tables.yards.rear;

    let primary = match ctx.primary_residence() {
        Ok(primary) => primary,
        Err(reason) => return ConstraintResult::unsupported(reason, table.section.clone()),
    };

    let mut result = ConstraintResult::new(feet(table.baseline_ft), table.section.clone())
        .with_url(table.url.clone())
        .with_manual_review(true);

    match ctx.facts.lot_frontage_ft {
        Some(frontage) if frontage < table.narrow_lot_frontage_ft => {
            result = result.with_note(format!(
                "Lots with less than {:.0} ft of frontage may require a {:.0} ft rear yard",
                table.narrow_lot_frontage_ft, table.narrow_lot_rear_yard_ft
            ));
        }
        Some(_) => {}
        None => {
            result = result.with_note(format!(
                "Lot frontage unknown; the narrow lot rule for lots under {:.0} ft could not be \
                 checked",
                table.narrow_lot_frontage_ft
            ));
        }
    }

    match ctx.facts.lot_depth_ft {
        Some(depth) if depth < table.shallow_lot_depth_ft => {
            result = result.with_note(format!(
                "Lots less than {:.0} ft deep may qualify for a shallow lot reduction if the lot \
                 existed in its current form before 1961; not applied",
                table.shallow_lot_depth_ft
            ));
        }
        Some(_) => {}
        None => {
            result = result.with_note(format!(
                "Lot depth unknown; the shallow lot rule for lots under {:.0} ft deep could not \
                 be checked",
                table.shallow_lot_depth_ft
            ));
        }
    }

    if ctx.lot_type == LotType::Corner {
        result = result.with_note(
            "Corner lot portions within 100 ft of a street may be exempt from rear yard \
             requirements; not evaluated",
        );
    }

    ctx.with_multi_district_note(result, primary.district)
}

fn missing<T>(found: Lookup<'_, T>, section: String) -> ConstraintResult {
    let reason = match found {
        Lookup::Missing { reason } => reason,
        Lookup::Exact { key, .. } | Lookup::Base { key, .. } => {
            format!("District {key} has no usable yard entry")
        }
    };
    ConstraintResult::unsupported(reason, section)
}

//! Maximum lot coverage (ZR 23-361, ZR 23-362).

use nyc_zoning_models::{
    BuildingType, ConstraintResult, ConstraintValue, DistrictTier, LotType, Quantity, Unit,
};

use super::{EvaluationContext, with_lookup_assumption};
use crate::tables::{CoverageValues, Lookup, lookup};

/// Resolves the maximum lot coverage percentage for the primary residence
/// district, building type, and lot type.
#[must_use]
pub fn calculate(ctx: &EvaluationContext<'_>) -> ConstraintResult {
    let table = &ctx.tables.lot_coverage;

    let primary = match ctx.primary_residence() {
        Ok(primary) => primary,
        Err(reason) => {
            return ConstraintResult::unsupported(reason, table.low_density_section.clone());
        }
    };

    let (section, url) = match primary.tier {
        DistrictTier::LowDensity => (&table.low_density_section, &table.low_density_url),
        DistrictTier::MediumHighDensity => (
            &table.medium_high_density_section,
            &table.medium_high_density_url,
        ),
    };

    let district = primary.district;
    if table.yard_based.contains(&district.normalized) {
        let result = ConstraintResult::unsupported(
            format!(
                "Lot coverage in {} follows from yard and open area rules, which are not \
                 evaluated",
                district.normalized
            ),
            section.clone(),
        )
        .with_url(url.clone())
        .with_manual_review(true);
        return ctx.with_multi_district_note(result, district);
    }

    let found = lookup(&table.districts, district, "lot coverage");
    let Some(entry) = found.entry() else {
        let reason = match found {
            Lookup::Missing { reason } => reason,
            _ => format!("District {} is not in the lot coverage table", district.normalized),
        };
        return ConstraintResult::unsupported(reason, section.clone()).with_url(url.clone());
    };

    let values = match (ctx.building_type, entry.one_two_family) {
        (BuildingType::SingleOrTwoFamily, Some(values)) => values,
        _ => CoverageValues {
            interior: entry.interior,
            corner: entry.corner,
        },
    };
    let percent = match ctx.lot_type {
        LotType::Corner => values.corner,
        LotType::InteriorOrThrough => values.interior,
    };

    let mut result = ConstraintResult::new(
        ConstraintValue::Fixed {
            quantity: Quantity::scalar(percent, Unit::Percent),
        },
        section.clone(),
    )
    .with_url(url.clone());
    result = with_lookup_assumption(result, found.assumption());

    if primary.tier == DistrictTier::MediumHighDensity {
        result = result.with_note(
            "Eligible site lot coverage provisions were not evaluated; the standard \
             percentage is shown",
        );
    }

    ctx.with_multi_district_note(result, district)
}

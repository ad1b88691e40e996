//! Dwelling unit cap (ZR 23-52).
//!
//! The cap is the maximum residential floor area divided by the dwelling
//! unit factor. Qualifying affordable, senior, and conversion housing is
//! exempt, and the engine cannot tell whether a project qualifies, so the
//! result is a toggle between the capped and uncapped scenarios.

use nyc_zoning_models::{ConstraintResult, ConstraintValue, Quantity, Scenario, Unit};

use super::EvaluationContext;

/// Square feet of floor area per dwelling unit.
pub const DWELLING_UNIT_FACTOR: f64 = 680.0;

/// Fractional units at or above this round up.
const ROUND_UP_FRACTION: f64 = 0.75;

const SECTION: &str = "ZR 23-52";
const URL: &str = "https://zr.planning.nyc.gov/article-ii/chapter-3#23-52";

/// Divides floor area by the dwelling unit factor, rounding a fractional
/// remainder of 0.75 or more up and anything less down.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_units(floor_area_sqft: f64, duf: f64) -> u32 {
    if floor_area_sqft <= 0.0 || duf <= 0.0 {
        return 0;
    }
    let raw = floor_area_sqft / duf;
    let whole = raw.floor();
    let units = if raw - whole >= ROUND_UP_FRACTION - 1e-9 {
        whole + 1.0
    } else {
        whole
    };
    units as u32
}

/// Maximum dwelling units for a floor area under the standard factor.
#[must_use]
pub fn max_dwelling_units(max_buildable_floor_area_sqft: f64) -> u32 {
    round_units(max_buildable_floor_area_sqft, DWELLING_UNIT_FACTOR)
}

/// Computes the dwelling unit cap from the maximum buildable floor area.
#[must_use]
pub fn calculate(
    ctx: &EvaluationContext<'_>,
    max_buildable_floor_area_sqft: Option<f64>,
) -> ConstraintResult {
    if let Err(reason) = ctx.primary_residence() {
        return ConstraintResult::unsupported(reason, SECTION).with_url(Some(URL));
    }

    if !ctx.multiple_dwelling_rules_apply() {
        return ConstraintResult::not_applicable(
            "Dwelling unit cap applies to multiple dwellings or buildings with more than two units",
            SECTION,
        )
        .with_url(Some(URL));
    }

    let Some(floor_area) = max_buildable_floor_area_sqft else {
        return ConstraintResult::unsupported(
            "Maximum buildable floor area is unknown, so the dwelling unit cap cannot be computed",
            SECTION,
        )
        .with_url(Some(URL));
    };

    let units = max_dwelling_units(floor_area);
    log::debug!("Dwelling unit cap: {floor_area} / {DWELLING_UNIT_FACTOR} -> {units}");

    let scenarios = vec![
        Scenario {
            key: "duf_applies".to_string(),
            label: "Dwelling unit factor applies".to_string(),
            quantity: Some(Quantity::scalar(f64::from(units), Unit::DwellingUnits)),
            note: Some(format!(
                "{floor_area:.0} sq ft / {DWELLING_UNIT_FACTOR:.0} = {:.2}; fractions of 0.75 or \
                 more round up",
                floor_area / DWELLING_UNIT_FACTOR
            )),
        },
        Scenario {
            key: "duf_not_applicable".to_string(),
            label: "Dwelling unit factor does not apply".to_string(),
            quantity: None,
            note: Some(
                "Qualifying affordable, senior, and conversion housing has no dwelling unit cap"
                    .to_string(),
            ),
        },
    ];

    ConstraintResult::new(ConstraintValue::Toggle { scenarios }, SECTION)
        .with_url(Some(URL))
        .with_note("Whether the project qualifies for an exemption is not evaluated")
}

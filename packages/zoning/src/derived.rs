//! Floor area and footprint derived from the FAR and lot coverage results.

use nyc_zoning_models::{ConstraintResult, DerivedValues, ParcelFacts};

/// Derived values together with the assumptions made computing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    /// The values.
    pub values: DerivedValues,
    /// Why a value is missing or surprising.
    pub assumptions: Vec<String>,
}

/// Combines FAR and lot coverage with the lot area.
///
/// Max buildable floor area needs a resolved FAR (fixed, or the
/// controlling value of several districts) and a positive lot area.
/// Remaining floor area also needs the existing floor area and is negative
/// when the lot is overbuilt. Max footprint needs a fixed coverage
/// percentage.
#[must_use]
pub fn aggregate(
    facts: &ParcelFacts,
    far: &ConstraintResult,
    lot_coverage: &ConstraintResult,
) -> Aggregate {
    let mut assumptions = Vec::new();

    let lot_area = facts.positive_lot_area();
    if lot_area.is_none() {
        assumptions.push(match facts.lot_area_sqft {
            Some(area) => format!(
                "Lot area {area} sq ft is not positive; floor area and footprint were not derived"
            ),
            None => "Lot area unknown; floor area and footprint were not derived".to_string(),
        });
    }

    let max_buildable = lot_area.zip(far.resolved_scalar()).map(|(area, far)| far * area);

    let remaining = max_buildable
        .zip(facts.existing_floor_area_sqft)
        .map(|(max, existing)| max - existing);
    if let Some(overbuilt) = remaining.filter(|r| *r < 0.0) {
        assumptions.push(format!(
            "Existing floor area exceeds the maximum by {:.0} sq ft; the lot is overbuilt",
            -overbuilt
        ));
    }

    let max_footprint = lot_area
        .zip(lot_coverage.fixed_scalar())
        .map(|(area, percent)| percent / 100.0 * area);

    log::debug!(
        "Derived: max buildable {max_buildable:?}, remaining {remaining:?}, footprint \
         {max_footprint:?}"
    );

    Aggregate {
        values: DerivedValues {
            max_buildable_floor_area_sqft: max_buildable,
            remaining_floor_area_sqft: remaining,
            max_footprint_sqft: max_footprint,
        },
        assumptions,
    }
}

#[cfg(test)]
mod tests {
    use nyc_zoning_models::{ConstraintValue, Quantity, Unit};

    use super::*;

    fn fixed(value: f64, unit: Unit) -> ConstraintResult {
        ConstraintResult::new(
            ConstraintValue::Fixed {
                quantity: Quantity::scalar(value, unit),
            },
            "ZR 23-22",
        )
    }

    fn facts(lot_area: Option<f64>, existing: Option<f64>) -> ParcelFacts {
        ParcelFacts {
            lot_area_sqft: lot_area,
            existing_floor_area_sqft: existing,
            ..ParcelFacts::default()
        }
    }

    #[test]
    fn computes_all_values() {
        let aggregate = aggregate(
            &facts(Some(4_000.0), Some(3_000.0)),
            &fixed(2.2, Unit::Ratio),
            &fixed(60.0, Unit::Percent),
        );
        let values = aggregate.values;
        assert!((values.max_buildable_floor_area_sqft.unwrap() - 8_800.0).abs() < 1e-6);
        assert!((values.remaining_floor_area_sqft.unwrap() - 5_800.0).abs() < 1e-6);
        assert!((values.max_footprint_sqft.unwrap() - 2_400.0).abs() < 1e-6);
        assert!(aggregate.assumptions.is_empty());
    }

    #[test]
    fn uses_controlling_far() {
        let far = ConstraintResult::new(
            ConstraintValue::Candidates {
                candidates: Vec::new(),
                controlling: Some(Quantity::scalar(2.0, Unit::Ratio)),
            },
            "ZR 23-22",
        );
        let aggregate = aggregate(
            &facts(Some(1_000.0), None),
            &far,
            &ConstraintResult::unsupported("n/a", "ZR 23-361"),
        );
        assert_eq!(aggregate.values.max_buildable_floor_area_sqft, Some(2_000.0));
        assert_eq!(aggregate.values.remaining_floor_area_sqft, None);
        assert_eq!(aggregate.values.max_footprint_sqft, None);
    }

    #[test]
    fn overbuilt_lot_is_negative_with_assumption() {
        let aggregate = aggregate(
            &facts(Some(1_000.0), Some(3_000.0)),
            &fixed(2.0, Unit::Ratio),
            &fixed(60.0, Unit::Percent),
        );
        assert_eq!(aggregate.values.remaining_floor_area_sqft, Some(-1_000.0));
        assert!(aggregate.assumptions[0].contains("overbuilt"));
    }

    #[test]
    fn guards_non_positive_lot_area() {
        for area in [Some(0.0), Some(-10.0), None] {
            let aggregate = aggregate(
                &facts(area, Some(100.0)),
                &fixed(2.0, Unit::Ratio),
                &fixed(60.0, Unit::Percent),
            );
            assert_eq!(aggregate.values, DerivedValues::default());
            assert_eq!(aggregate.assumptions.len(), 1);
        }
    }
}

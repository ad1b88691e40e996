//! Minimum base height and height envelope (ZR 23-42, ZR 23-432).
//!
//! R1-R5 height rules depend on building form and have no single number,
//! so both calculators refer the reader to the low-density section. For
//! R6-R12 the table gives one value or, where street width or program
//! election decides, every candidate.

use nyc_zoning_models::{
    Candidate, ConstraintResult, ConstraintValue, DistrictTier, Quantity, Unit,
};

use super::{EvaluationContext, with_lookup_assumption};
use crate::tables::{EnvelopeEntry, HeightTable, Lookup, MinBaseHeightEntry, lookup};

/// Resolves the minimum base height.
#[must_use]
pub fn min_base_height(ctx: &EvaluationContext<'_>) -> ConstraintResult {
    let table = &ctx.tables.min_base_height;
    evaluate(ctx, table, "minimum base height", |entry| match entry {
        MinBaseHeightEntry::Fixed { feet } => ConstraintValue::Fixed {
            quantity: Quantity::scalar(*feet, Unit::Feet),
        },
        MinBaseHeightEntry::Conditional { candidates } => ConstraintValue::Conditional {
            candidates: candidates
                .iter()
                .map(|c| Candidate {
                    quantity: Quantity::scalar(c.feet, Unit::Feet),
                    condition: c.condition.clone(),
                    citation: table.section.clone(),
                })
                .collect(),
        },
    })
}

/// Resolves the maximum base height and maximum building height.
#[must_use]
pub fn envelope(ctx: &EvaluationContext<'_>) -> ConstraintResult {
    let table = &ctx.tables.envelope;
    evaluate(ctx, table, "height envelope", |entry| match entry {
        EnvelopeEntry::Fixed { base, building } => ConstraintValue::Fixed {
            quantity: Quantity::Envelope {
                max_base_height_ft: *base,
                max_building_height_ft: *building,
            },
        },
        EnvelopeEntry::Conditional { candidates } => ConstraintValue::Conditional {
            candidates: candidates
                .iter()
                .map(|c| Candidate {
                    quantity: Quantity::Envelope {
                        max_base_height_ft: c.base,
                        max_building_height_ft: c.building,
                    },
                    condition: c.condition.clone(),
                    citation: table.section.clone(),
                })
                .collect(),
        },
    })
}

fn evaluate<E>(
    ctx: &EvaluationContext<'_>,
    table: &HeightTable<E>,
    table_name: &str,
    to_value: impl Fn(&E) -> ConstraintValue,
) -> ConstraintResult {
    let primary = match ctx.primary_residence() {
        Ok(primary) => primary,
        Err(reason) => return ConstraintResult::unsupported(reason, table.section.clone()),
    };
    let district = primary.district;

    if primary.tier == DistrictTier::LowDensity {
        let result = ConstraintResult::new(
            ConstraintValue::SeeSection {
                section: table.low_density_section.clone(),
            },
            table.low_density_section.clone(),
        )
        .with_note(format!(
            "{} height limits depend on building form; see {}",
            district.normalized, table.low_density_section
        ));
        return ctx.with_multi_district_note(result, district);
    }

    let found = lookup(&table.districts, district, table_name);
    let Some(entry) = found.entry() else {
        let reason = match found {
            Lookup::Missing { reason } => reason,
            _ => format!("District {} is not in the {table_name} table", district.normalized),
        };
        return ConstraintResult::unsupported(reason, table.section.clone())
            .with_url(table.url.clone());
    };

    let value = to_value(entry);
    let conditional = matches!(value, ConstraintValue::Conditional { .. });

    let mut result =
        ConstraintResult::new(value, table.section.clone()).with_url(table.url.clone());
    result = with_lookup_assumption(result, found.assumption());
    if conditional {
        result = result
            .with_note(
                "Applicable value depends on street width and program election, which are not \
                 evaluated",
            )
            .with_manual_review(true);
    }

    ctx.with_multi_district_note(result, district)
}

#[cfg(test)]
mod tests {
    use nyc_zoning_models::ConstraintKind;

    use super::*;
    use crate::calculators::test_support::Fixture;

    #[test]
    fn low_density_refers_to_section() {
        let fixture = Fixture::new(&["R5"]);
        for result in [min_base_height(&fixture.ctx()), envelope(&fixture.ctx())] {
            assert_eq!(result.kind(), ConstraintKind::SeeSection);
            assert_eq!(result.source_section, "ZR 23-42");
            assert!(!result.requires_manual_review);
        }
    }

    #[test]
    fn ambiguous_min_base_height_lists_every_candidate() {
        for district in ["R6", "R8", "R9", "R10"] {
            let result = min_base_height(&Fixture::new(&[district]).ctx());
            assert_eq!(result.kind(), ConstraintKind::Conditional, "{district}");
            assert_eq!(result.candidates().len(), 2);
            assert!(result.requires_manual_review);
        }
    }

    #[test]
    fn contextual_envelope_is_fixed() {
        let result = envelope(&Fixture::new(&["R7A"]).ctx());
        assert_eq!(result.kind(), ConstraintKind::Fixed);
        assert_eq!(
            result.value,
            ConstraintValue::Fixed {
                quantity: Quantity::Envelope {
                    max_base_height_ft: 75.0,
                    max_building_height_ft: 95.0,
                }
            }
        );
        assert!(!result.requires_manual_review);
    }

    #[test]
    fn variant_falls_back_to_base_candidates() {
        let result = envelope(&Fixture::new(&["R7-2"]).ctx());
        assert_eq!(result.kind(), ConstraintKind::Conditional);
        assert_eq!(result.assumptions.len(), 1);
        assert!(result.assumptions[0].contains("R7-2"));
    }

    #[test]
    fn fixed_min_base_height() {
        let result = min_base_height(&Fixture::new(&["R7"]).ctx());
        assert_eq!(result.fixed_scalar(), Some(40.0));
    }

    #[test]
    fn no_district_is_unsupported() {
        let fixture = Fixture::new(&[]);
        assert!(min_base_height(&fixture.ctx()).is_unsupported());
        assert!(envelope(&fixture.ctx()).is_unsupported());
    }
}

//! Maximum floor area ratio (ZR 23-21, ZR 23-22).

use nyc_zoning_models::{Candidate, ConstraintResult, ConstraintValue, Quantity, Unit};

use super::EvaluationContext;
use crate::multi_district::resolve_minimum;
use crate::tables::{Citation, Lookup, lookup};

struct Resolved<'t> {
    candidate: Candidate,
    citation: &'t Citation,
    assumption: Option<String>,
}

/// Resolves the FAR of every district candidate. One resolved district is
/// a fixed value; several become a candidate list whose controlling value
/// is the minimum.
#[must_use]
pub fn calculate(ctx: &EvaluationContext<'_>) -> ConstraintResult {
    let table = &ctx.tables.far;
    let fallback_section = format!(
        "{} / {}",
        table.low_density.section, table.medium_high_density.section
    );

    if ctx.districts.is_empty() {
        return ConstraintResult::unsupported(
            "No zoning district is mapped on this lot",
            fallback_section,
        );
    }

    let mut resolved = Vec::new();
    let mut misses = Vec::new();

    for district in ctx.districts {
        let citation = district
            .tier()
            .map_or(&table.medium_high_density, |tier| table.citation(tier));

        match lookup(&table.districts, district, "FAR") {
            Lookup::Missing { reason } => misses.push(reason),
            found => {
                let Some(far) = found.entry().copied() else {
                    continue;
                };
                log::debug!("FAR for {}: {far}", district.normalized);
                resolved.push(Resolved {
                    candidate: Candidate {
                        quantity: Quantity::scalar(far, Unit::Ratio),
                        condition: format!("Portion of the lot in {}", district.normalized),
                        citation: citation.section.clone(),
                    },
                    citation,
                    assumption: found.assumption().map(str::to_string),
                });
            }
        }
    }

    if resolved.is_empty() {
        return ConstraintResult::unsupported(misses.join("; "), fallback_section);
    }

    let assumptions: Vec<String> = resolved
        .iter()
        .filter_map(|r| r.assumption.clone())
        .collect();
    let has_misses = !misses.is_empty();

    let mut result = if resolved.len() == 1 {
        let only = resolved.remove(0);
        ConstraintResult::new(
            ConstraintValue::Fixed {
                quantity: only.candidate.quantity,
            },
            only.citation.section.clone(),
        )
        .with_url(only.citation.url.clone())
    } else {
        let candidates: Vec<Candidate> = resolved.iter().map(|r| r.candidate.clone()).collect();
        let Some(resolution) = resolve_minimum(&candidates) else {
            return ConstraintResult::unsupported("No FAR candidate has a value", fallback_section);
        };
        let controlling = &resolved[resolution.index];

        ConstraintResult::new(
            ConstraintValue::Candidates {
                candidates,
                controlling: Some(resolution.controlling.clone()),
            },
            controlling.citation.section.clone(),
        )
        .with_url(controlling.citation.url.clone())
        .with_note(format!(
            "Lot is mapped in several districts; the lowest FAR ({}) controls pending review \
             of the floor area allocation across district boundaries",
            controlling.candidate.condition
        ))
        .with_manual_review(resolution.requires_manual_review)
    };

    result.assumptions.extend(assumptions);
    for miss in misses {
        result = result.with_note(miss);
    }
    if has_misses {
        result = result.with_manual_review(true);
    }

    result
}

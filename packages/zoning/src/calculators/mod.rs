//! Constraint calculators.
//!
//! Each calculator is a pure function of an [`EvaluationContext`] that
//! returns one [`ConstraintResult`]. None of them fail: a district the
//! tables do not cover becomes [`ConstraintValue::Unsupported`] and an
//! ambiguous rule becomes a conditional or candidate list flagged for
//! manual review.
//!
//! [`ConstraintValue::Unsupported`]: nyc_zoning_models::ConstraintValue::Unsupported

pub mod density;
pub mod far;
pub mod height;
pub mod lot_coverage;
pub mod parking;
pub mod yards;

use nyc_zoning_models::{
    BuildingType, ConstraintResult, DistrictTier, LotType, NormalizedDistrict, ParcelFacts,
};

use crate::tables::ZoningTables;

/// Everything a calculator may read.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Sanitized parcel facts.
    pub facts: &'a ParcelFacts,
    /// Normalized district candidates in first-seen order.
    pub districts: &'a [NormalizedDistrict],
    /// Classified building type.
    pub building_type: BuildingType,
    /// Classified lot type.
    pub lot_type: LotType,
    /// Lookup tables.
    pub tables: &'a ZoningTables,
}

impl<'a> EvaluationContext<'a> {
    /// Whether more than one district is mapped on the lot.
    #[must_use]
    pub const fn is_multi_district(&self) -> bool {
        self.districts.len() > 1
    }

    /// Whether the dwelling-unit and parking rules for multiple dwellings
    /// apply: the building is a multiple dwelling, or it already holds
    /// more than two units.
    #[must_use]
    pub fn multiple_dwelling_rules_apply(&self) -> bool {
        self.building_type == BuildingType::MultipleDwelling
            || self.facts.existing_units.is_some_and(|units| units > 2)
    }

    /// Returns the residence district the non-FAR calculators evaluate:
    /// the first candidate in the R1-R12 range.
    ///
    /// # Errors
    ///
    /// Returns the reason for an unsupported result when the lot has no
    /// district, or none of its districts is an R1-R12 residence district.
    pub fn primary_residence(&self) -> Result<PrimaryDistrict<'a>, String> {
        let Some(first) = self.districts.first() else {
            return Err("No zoning district is mapped on this lot".to_string());
        };

        self.districts
            .iter()
            .find_map(|district| {
                district
                    .tier()
                    .map(|tier| PrimaryDistrict { district, tier })
            })
            .ok_or_else(|| {
                format!(
                    "District {} is not an R1-R12 residence district",
                    first.normalized
                )
            })
    }

    /// Adds the multi-district caveat to a result computed for
    /// `primary` alone.
    #[must_use]
    pub fn with_multi_district_note(
        &self,
        result: ConstraintResult,
        primary: &NormalizedDistrict,
    ) -> ConstraintResult {
        if !self.is_multi_district() {
            return result;
        }

        let all = self
            .districts
            .iter()
            .map(|d| d.normalized.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        result
            .with_note(format!(
                "Lot is mapped in several districts ({all}); evaluated for {} only",
                primary.normalized
            ))
            .with_manual_review(true)
    }
}

/// The residence district a calculator is evaluating, with its tier.
#[derive(Debug, Clone, Copy)]
pub struct PrimaryDistrict<'a> {
    /// The district.
    pub district: &'a NormalizedDistrict,
    /// Its density tier.
    pub tier: DistrictTier,
}

/// Appends a table lookup's base-district assumption, if any.
pub(crate) fn with_lookup_assumption(
    result: ConstraintResult,
    assumption: Option<&str>,
) -> ConstraintResult {
    match assumption {
        Some(assumption) => result.with_assumption(assumption),
        None => result,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Fixture;
    use super::*;

    #[test]
    fn primary_residence_skips_non_residence_districts() {
        let fixture = Fixture::new(&["C4-4", "R7A"]);
        let primary = fixture.ctx().primary_residence().unwrap();
        assert_eq!(primary.district.normalized, "R7A");
        assert_eq!(primary.tier, DistrictTier::MediumHighDensity);
    }

    #[test]
    fn primary_residence_reasons() {
        let empty = Fixture::new(&[]);
        assert!(empty.ctx().primary_residence().unwrap_err().contains("No zoning"));

        let commercial = Fixture::new(&["M1-1"]);
        assert!(
            commercial
                .ctx()
                .primary_residence()
                .unwrap_err()
                .contains("M1-1")
        );
    }

    #[test]
    fn multiple_dwelling_rules() {
        let mut fixture = Fixture::new(&["R6"]);
        assert!(!fixture.ctx().multiple_dwelling_rules_apply());

        fixture.facts.existing_units = Some(3);
        assert!(fixture.ctx().multiple_dwelling_rules_apply());

        fixture.facts.existing_units = Some(2);
        fixture.building_type = BuildingType::MultipleDwelling;
        assert!(fixture.ctx().multiple_dwelling_rules_apply());
    }
}

//! The zoning report produced for one parcel.

use serde::{Deserialize, Serialize};

use crate::{
    Bbl, BuildingType, ConstraintResult, DistrictCandidates, LotType, TransitZone,
};

/// Values derived from the FAR and lot coverage results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedValues {
    /// FAR x lot area.
    pub max_buildable_floor_area_sqft: Option<f64>,
    /// Max buildable minus existing floor area. Negative when the lot is
    /// already overbuilt.
    pub remaining_floor_area_sqft: Option<f64>,
    /// Lot coverage fraction x lot area.
    pub max_footprint_sqft: Option<f64>,
}

/// Boolean indicators summarizing what the engine could not evaluate or
/// had to infer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct ZoningFlags {
    /// A commercial overlay is mapped on the lot.
    pub has_overlay: bool,
    /// A special purpose district is mapped on the lot.
    pub has_special_district: bool,
    /// More than one zoning district is mapped on the lot.
    pub multi_district_lot: bool,
    /// The building type was defaulted rather than read from the class.
    pub building_type_inferred: bool,
    /// No geocoder record existed, so the lot type was defaulted.
    pub lot_type_inferred: bool,
    /// Eligible-site lot coverage bonuses were not evaluated.
    pub eligible_site_not_evaluated: bool,
    /// At least one lookup substituted the base district.
    pub base_district_fallback_used: bool,
    /// The transit zone is unknown or spans several parking regimes.
    pub transit_zone_unresolved: bool,
    /// The lot intersects a flood hazard zone.
    pub in_flood_zone: bool,
    /// At least one constraint result requires manual review.
    pub requires_manual_review: bool,
}

/// The complete zoning evaluation of one parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoningResolutionResult {
    /// Tax lot identifier, if known.
    pub bbl: Option<Bbl>,
    /// Normalized district candidates, in first-seen order.
    pub districts: DistrictCandidates,
    /// Building type used for rule selection.
    pub building_type: BuildingType,
    /// Lot type used for rule selection.
    pub lot_type: LotType,
    /// Transit zone used for parking regime selection.
    pub transit_zone: TransitZone,
    /// Maximum floor area ratio.
    pub far: ConstraintResult,
    /// Maximum lot coverage.
    pub lot_coverage: ConstraintResult,
    /// Minimum base height.
    pub min_base_height: ConstraintResult,
    /// Maximum base and building height.
    pub height_envelope: ConstraintResult,
    /// Dwelling unit cap.
    pub density: ConstraintResult,
    /// Required accessory parking.
    pub parking: ConstraintResult,
    /// Front yard depth.
    pub front_yard: ConstraintResult,
    /// Side yard width.
    pub side_yard: ConstraintResult,
    /// Rear yard depth.
    pub rear_yard: ConstraintResult,
    /// Floor area and footprint derived from FAR and lot coverage.
    pub derived: DerivedValues,
    /// Every assumption made, in evaluation order, without duplicates.
    pub assumptions: Vec<String>,
    /// Summary flags.
    pub flags: ZoningFlags,
}

impl ZoningResolutionResult {
    /// Returns every constraint result with its family name, in report
    /// order.
    #[must_use]
    pub fn constraints(&self) -> [(&'static str, &ConstraintResult); 9] {
        [
            ("far", &self.far),
            ("lot_coverage", &self.lot_coverage),
            ("min_base_height", &self.min_base_height),
            ("height_envelope", &self.height_envelope),
            ("density", &self.density),
            ("parking", &self.parking),
            ("front_yard", &self.front_yard),
            ("side_yard", &self.side_yard),
            ("rear_yard", &self.rear_yard),
        ]
    }
}

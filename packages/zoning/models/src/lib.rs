#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Parcel fact, constraint result, and zoning report types.
//!
//! This crate defines the data that flows into and out of the zoning rule
//! engine. Upstream collaborators (geocoding, the parcel registry, transit
//! zone lookups) populate a [`ParcelFacts`]; the engine turns it into a
//! [`ZoningResolutionResult`] made of one [`ConstraintResult`] per
//! constraint family.

pub mod constraint;
pub mod facts;
pub mod report;

pub use constraint::{
    Candidate, ConstraintKind, ConstraintResult, ConstraintValue, Quantity, Scenario, Unit,
};
pub use facts::{Bbl, InvalidBblError, ParcelFacts, TransitZoneQuery};
pub use report::{DerivedValues, ZoningFlags, ZoningResolutionResult};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The five NYC boroughs, numbered as in the tax-lot system.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Borough {
    /// Borough code 1
    Manhattan = 1,
    /// Borough code 2
    Bronx = 2,
    /// Borough code 3
    Brooklyn = 3,
    /// Borough code 4
    Queens = 4,
    /// Borough code 5
    StatenIsland = 5,
}

impl Borough {
    /// Returns the numeric borough code (1-5).
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Creates a borough from its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Manhattan),
            2 => Some(Self::Bronx),
            3 => Some(Self::Brooklyn),
            4 => Some(Self::Queens),
            5 => Some(Self::StatenIsland),
            _ => None,
        }
    }

    /// Parses the two-letter abbreviations used by the parcel registry
    /// (`"MN"`, `"BX"`, `"BK"`, `"QN"`, `"SI"`) as well as full names and
    /// numeric codes.
    #[must_use]
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        match upper.as_str() {
            "1" | "MN" | "MANHATTAN" | "NEW YORK" => Some(Self::Manhattan),
            "2" | "BX" | "BRONX" | "THE BRONX" => Some(Self::Bronx),
            "3" | "BK" | "BROOKLYN" | "KINGS" => Some(Self::Brooklyn),
            "4" | "QN" | "QUEENS" => Some(Self::Queens),
            "5" | "SI" | "STATEN ISLAND" | "RICHMOND" => Some(Self::StatenIsland),
            _ => None,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Manhattan,
            Self::Bronx,
            Self::Brooklyn,
            Self::Queens,
            Self::StatenIsland,
        ]
    }
}

/// Residential building type derived from the building class code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BuildingType {
    /// One- or two-family residence (building classes `A*`, `B*`)
    SingleOrTwoFamily,
    /// Multiple dwelling (building classes `C*`, `D*`)
    MultipleDwelling,
}

/// Lot type with respect to street frontage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LotType {
    /// Lot at the intersection of two streets
    Corner,
    /// Interior lot or through lot
    InteriorOrThrough,
}

/// Transit zone category that selects the parking regime.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransitZone {
    /// Inner Transit Zone (ZR 25-21)
    Inner,
    /// Outer Transit Zone (ZR 25-22)
    Outer,
    /// Manhattan Core or Long Island City
    ManhattanCoreLic,
    /// Beyond the Greater Transit Zone (ZR 25-23)
    BeyondGtz,
    /// The spatial lookup failed or returned something unrecognized
    #[default]
    Unknown,
}

impl TransitZone {
    /// Maps a label returned by a transit-zone map layer to a category.
    ///
    /// Matching is a case-insensitive substring test. Returns `None` when
    /// the label is not recognized.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();

        if lower.contains("inner transit zone") {
            return Some(Self::Inner);
        }
        if lower.contains("outer transit zone") {
            return Some(Self::Outer);
        }
        if lower.contains("manhattan core") || lower.contains("long island city") {
            return Some(Self::ManhattanCoreLic);
        }

        None
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Inner,
            Self::Outer,
            Self::ManhattanCoreLic,
            Self::BeyondGtz,
            Self::Unknown,
        ]
    }
}

/// A raw district string after canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDistrict {
    /// Uppercase, trimmed district code (e.g. `"R7-2"`).
    pub normalized: String,
    /// Letter-plus-digits prefix (e.g. `"R7"`), `None` for non-residential
    /// districts.
    pub base_district: Option<String>,
}

/// Residential density tier, which decides the ZR section family that
/// governs most bulk rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DistrictTier {
    /// R1 through R5
    LowDensity,
    /// R6 through R12
    MediumHighDensity,
}

impl NormalizedDistrict {
    /// Numeric part of the base district (`R7` -> 7).
    #[must_use]
    pub fn density_number(&self) -> Option<u8> {
        self.base_district
            .as_deref()
            .and_then(|base| base.strip_prefix('R'))
            .and_then(|digits| digits.parse().ok())
    }

    /// Returns the density tier, or `None` when the district is not an
    /// R1-R12 residence district.
    #[must_use]
    pub fn tier(&self) -> Option<DistrictTier> {
        match self.density_number()? {
            1..=5 => Some(DistrictTier::LowDensity),
            6..=12 => Some(DistrictTier::MediumHighDensity),
            _ => None,
        }
    }
}

/// Ordered, de-duplicated district codes mapped onto one lot.
pub type DistrictCandidates = Vec<NormalizedDistrict>;

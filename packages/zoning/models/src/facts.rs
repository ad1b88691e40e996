//! Parcel facts supplied to the rule engine.
//!
//! A [`ParcelFacts`] is assembled by the fact-collection pipeline from the
//! geocoder, the parcel registry, and a transit-zone lookup, or loaded
//! directly from a JSON file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Borough, TransitZone};

/// Borough-Block-Lot tax lot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bbl {
    /// Borough.
    pub borough: Borough,
    /// Tax block (1-99999).
    pub block: u32,
    /// Tax lot (1-9999).
    pub lot: u16,
}

/// Error returned when a string is not a valid 10-digit BBL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidBblError {
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for InvalidBblError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid BBL {:?}: expected 10 digits (borough, 5-digit block, 4-digit lot)",
            self.value
        )
    }
}

impl std::error::Error for InvalidBblError {}

impl FromStr for Bbl {
    type Err = InvalidBblError;

    /// Parses `"3012340056"`. A trailing decimal part (`"3012340056.00000000"`,
    /// as some registries export it) is ignored.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || InvalidBblError {
            value: raw.to_string(),
        };

        let digits = raw.trim().split('.').next().unwrap_or_default();
        if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let borough = digits[..1]
            .parse::<u8>()
            .ok()
            .and_then(Borough::from_code)
            .ok_or_else(err)?;
        let block: u32 = digits[1..6].parse().map_err(|_| err())?;
        let lot: u16 = digits[6..].parse().map_err(|_| err())?;

        if block == 0 || lot == 0 {
            return Err(err());
        }

        Ok(Self {
            borough,
            block,
            lot,
        })
    }
}

impl TryFrom<String> for Bbl {
    type Error = InvalidBblError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bbl> for String {
    fn from(bbl: Bbl) -> Self {
        bbl.to_string()
    }
}

impl fmt::Display for Bbl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:05}{:04}",
            self.borough.code(),
            self.block,
            self.lot
        )
    }
}

/// Outcome of a point-in-polygon transit-zone query.
///
/// The distinction between [`Self::NoFeatures`] and [`Self::Failed`]
/// matters: a successful query with no intersecting polygon means the lot
/// is beyond the Greater Transit Zone, while a failed query says nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransitZoneQuery {
    /// The query succeeded and returned these zone labels.
    Matched {
        /// Labels of the intersecting polygons, in service order.
        labels: Vec<String>,
    },
    /// The query succeeded and no polygon contains the point.
    NoFeatures,
    /// The query could not be completed.
    Failed {
        /// Description of the failure.
        message: String,
    },
}

/// Facts about one tax lot, as supplied by upstream collaborators.
///
/// Numeric fields are either a non-negative finite number or absent. Use
/// [`ParcelFacts::sanitized`] before evaluating facts from an untrusted
/// source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelFacts {
    /// Tax lot identifier, if known.
    #[serde(default)]
    pub bbl: Option<Bbl>,
    /// Raw zoning district codes mapped onto the lot (up to four).
    #[serde(default)]
    pub zoning_districts: Vec<String>,
    /// Commercial overlay codes (e.g. `"C1-4"`).
    #[serde(default)]
    pub overlays: Vec<String>,
    /// Special purpose district codes.
    #[serde(default)]
    pub special_districts: Vec<String>,
    /// Lot area in square feet.
    #[serde(default)]
    pub lot_area_sqft: Option<f64>,
    /// Lot frontage in feet.
    #[serde(default)]
    pub lot_frontage_ft: Option<f64>,
    /// Lot depth in feet.
    #[serde(default)]
    pub lot_depth_ft: Option<f64>,
    /// Existing building floor area in square feet.
    #[serde(default)]
    pub existing_floor_area_sqft: Option<f64>,
    /// Building class code (e.g. `"A1"`, `"C0"`).
    #[serde(default)]
    pub building_class: Option<String>,
    /// Existing residential unit count.
    #[serde(default)]
    pub existing_units: Option<u32>,
    /// Borough.
    #[serde(default)]
    pub borough: Option<Borough>,
    /// Community district number within the borough.
    #[serde(default)]
    pub community_district: Option<u16>,
    /// Corner indicator from the geocoder; any non-empty value marks a
    /// corner lot.
    #[serde(default)]
    pub corner_code: Option<String>,
    /// Whether the geocoder returned a record for this lot at all.
    #[serde(default = "default_true")]
    pub geocoder_record_present: bool,
    /// Transit zone category.
    #[serde(default)]
    pub transit_zone: TransitZone,
    /// Flood hazard zone label, if the lot intersects one.
    #[serde(default)]
    pub flood_zone: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl Default for ParcelFacts {
    fn default() -> Self {
        Self {
            bbl: None,
            zoning_districts: Vec::new(),
            overlays: Vec::new(),
            special_districts: Vec::new(),
            lot_area_sqft: None,
            lot_frontage_ft: None,
            lot_depth_ft: None,
            existing_floor_area_sqft: None,
            building_class: None,
            existing_units: None,
            borough: None,
            community_district: None,
            corner_code: None,
            geocoder_record_present: true,
            transit_zone: TransitZone::Unknown,
            flood_zone: None,
        }
    }
}

impl ParcelFacts {
    /// Returns a copy with every negative, NaN, or infinite numeric field
    /// replaced by `None`, plus one note per dropped value.
    #[must_use]
    pub fn sanitized(&self) -> (Self, Vec<String>) {
        let mut facts = self.clone();
        let mut notes = Vec::new();

        for (label, field) in [
            ("lot area", &mut facts.lot_area_sqft),
            ("lot frontage", &mut facts.lot_frontage_ft),
            ("lot depth", &mut facts.lot_depth_ft),
            ("existing floor area", &mut facts.existing_floor_area_sqft),
        ] {
            let Some(value) = *field else {
                continue;
            };
            if !value.is_finite() || value < 0.0 {
                notes.push(format!(
                    "Ignored invalid {label} value ({value}); treated as unknown"
                ));
                *field = None;
            }
        }

        (facts, notes)
    }

    /// Lot area if it is known and strictly positive.
    #[must_use]
    pub fn positive_lot_area(&self) -> Option<f64> {
        self.lot_area_sqft.filter(|area| area.is_finite() && *area > 0.0)
    }
}

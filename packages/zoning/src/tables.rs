//! Compile-time embedded zoning lookup tables.
//!
//! Each regulatory table lives in a TOML file under `tables/` and is
//! embedded via `include_str!`. The files are parsed once, on first use,
//! into a shared [`ZoningTables`]. Every calculator resolves districts
//! through the single [`lookup`] function so the exact-match then
//! base-district fallback order is the same everywhere.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use nyc_zoning_models::{BuildingType, DistrictTier, NormalizedDistrict};
use serde::Deserialize;
use serde::de::DeserializeOwned;

const FAR_TOML: &str = include_str!("../tables/far.toml");
const HEIGHT_TOML: &str = include_str!("../tables/height.toml");
const YARDS_TOML: &str = include_str!("../tables/yards.toml");
const LOT_COVERAGE_TOML: &str = include_str!("../tables/lot_coverage.toml");
const PARKING_TOML: &str = include_str!("../tables/parking.toml");

static TABLES: LazyLock<ZoningTables> = LazyLock::new(|| {
    let heights: HeightTables = parse("height", HEIGHT_TOML);
    ZoningTables {
        far: parse("far", FAR_TOML),
        min_base_height: heights.min_base_height,
        envelope: heights.envelope,
        yards: parse("yards", YARDS_TOML),
        lot_coverage: parse("lot_coverage", LOT_COVERAGE_TOML),
        parking: parse("parking", PARKING_TOML),
    }
});

fn parse<T: DeserializeOwned>(name: &str, toml_str: &str) -> T {
    toml::de::from_str(toml_str)
        .unwrap_or_else(|e| panic!("Failed to parse zoning table '{name}': {e}"))
}

/// Returns the embedded zoning tables.
///
/// # Panics
///
/// Panics on first use if any embedded TOML table fails to parse. Since
/// these are compile-time constants, parse failures indicate a development
/// error and are caught by the tests in this module.
#[must_use]
pub fn tables() -> &'static ZoningTables {
    &TABLES
}

/// Every regulatory table the engine consults.
#[derive(Debug, Clone)]
pub struct ZoningTables {
    /// Floor area ratio.
    pub far: FarTable,
    /// Minimum base height (R6-R12).
    pub min_base_height: HeightTable<MinBaseHeightEntry>,
    /// Maximum base and building height (R6-R12).
    pub envelope: HeightTable<EnvelopeEntry>,
    /// Front, side, and rear yards.
    pub yards: YardTables,
    /// Lot coverage.
    pub lot_coverage: LotCoverageTable,
    /// Parking regimes.
    pub parking: ParkingTables,
}

impl ZoningTables {
    /// Every district key that appears in any table, sorted.
    #[must_use]
    pub fn known_districts(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .far
            .districts
            .keys()
            .chain(self.min_base_height.districts.keys())
            .chain(self.envelope.districts.keys())
            .chain(self.yards.front.districts.keys())
            .chain(self.yards.side.districts.keys())
            .chain(self.lot_coverage.districts.keys())
            .chain(self.parking.inner.districts.keys())
            .chain(self.parking.outer.districts.keys())
            .chain(self.parking.beyond_gtz.districts.keys())
            .map(String::as_str)
            .collect();
        keys.sort_by_key(|key| district_sort_key(key));
        keys.dedup();
        keys
    }
}

/// Sorts `R2` before `R10` and variants after their base district.
fn district_sort_key(key: &str) -> (u8, String) {
    let digits: String = key
        .chars()
        .skip(1)
        .take_while(char::is_ascii_digit)
        .collect();
    (digits.parse().unwrap_or(u8::MAX), key.to_string())
}

/// A ZR citation.
#[derive(Debug, Clone, Deserialize)]
pub struct Citation {
    /// Section label (e.g. `"ZR 23-22"`).
    pub section: String,
    /// Link to the section text.
    pub url: Option<String>,
}

/// Floor area ratio table.
#[derive(Debug, Clone, Deserialize)]
pub struct FarTable {
    /// Citation for R1-R5.
    pub low_density: Citation,
    /// Citation for R6-R12.
    pub medium_high_density: Citation,
    /// District -> FAR.
    pub districts: BTreeMap<String, f64>,
}

impl FarTable {
    /// Returns the citation governing the given tier.
    #[must_use]
    pub const fn citation(&self, tier: DistrictTier) -> &Citation {
        match tier {
            DistrictTier::LowDensity => &self.low_density,
            DistrictTier::MediumHighDensity => &self.medium_high_density,
        }
    }
}

#[derive(Deserialize)]
struct HeightTables {
    min_base_height: HeightTable<MinBaseHeightEntry>,
    envelope: HeightTable<EnvelopeEntry>,
}

/// A height table for R6-R12. R1-R5 have no table entries and are
/// referred to `low_density_section`.
#[derive(Debug, Clone, Deserialize)]
pub struct HeightTable<E> {
    /// Citation for R6-R12.
    pub section: String,
    /// Link to the R6-R12 section.
    pub url: Option<String>,
    /// Section R1-R5 readers are referred to.
    pub low_density_section: String,
    /// District -> entry.
    pub districts: BTreeMap<String, E>,
}

/// A minimum base height entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MinBaseHeightEntry {
    /// One value applies.
    Fixed {
        /// Minimum base height in feet.
        feet: f64,
    },
    /// Several values apply depending on conditions not modeled.
    Conditional {
        /// Every candidate.
        candidates: Vec<MinBaseHeightCandidate>,
    },
}

/// One candidate minimum base height.
#[derive(Debug, Clone, Deserialize)]
pub struct MinBaseHeightCandidate {
    /// Minimum base height in feet.
    pub feet: f64,
    /// When it applies.
    pub condition: String,
}

/// A height envelope entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeEntry {
    /// One envelope applies.
    Fixed {
        /// Maximum base height in feet.
        base: f64,
        /// Maximum building height in feet.
        building: f64,
    },
    /// Several envelopes apply depending on conditions not modeled.
    Conditional {
        /// Every candidate.
        candidates: Vec<EnvelopeCandidate>,
    },
}

/// One candidate height envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeCandidate {
    /// Maximum base height in feet.
    pub base: f64,
    /// Maximum building height in feet.
    pub building: f64,
    /// When it applies.
    pub condition: String,
}

/// Front, side, and rear yard tables.
#[derive(Debug, Clone, Deserialize)]
pub struct YardTables {
    /// Front yards.
    pub front: FrontYardTable,
    /// Side yards.
    pub side: SideYardTable,
    /// Rear yards.
    pub rear: RearYardTable,
}

/// Front yard depths.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontYardTable {
    /// Citation for R1-R5.
    pub low_density_section: String,
    /// Link for R1-R5.
    pub low_density_url: Option<String>,
    /// Citation for R6-R12.
    pub medium_high_density_section: String,
    /// Link for R6-R12.
    pub medium_high_density_url: Option<String>,
    /// Uniform R6-R12 depth.
    pub medium_high_density_ft: f64,
    /// R1-R5 district -> depth in feet.
    pub districts: BTreeMap<String, f64>,
}

/// Side yard widths by building type.
#[derive(Debug, Clone, Deserialize)]
pub struct SideYardTable {
    /// Citation for R1-R5.
    pub low_density_section: String,
    /// Link for R1-R5.
    pub low_density_url: Option<String>,
    /// Citation for R6-R12.
    pub medium_high_density_section: String,
    /// Link for R6-R12.
    pub medium_high_density_url: Option<String>,
    /// Uniform R6-R12 widths.
    pub medium_high_density: SideYardEntry,
    /// R1-R5 district -> widths.
    pub districts: BTreeMap<String, SideYardEntry>,
}

/// Side yard width per building type.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SideYardEntry {
    /// Width for single- and two-family residences.
    pub single_or_two_family: f64,
    /// Width for multiple dwellings.
    pub multiple_dwelling: f64,
}

impl SideYardEntry {
    /// Width for the given building type.
    #[must_use]
    pub const fn for_building(&self, building_type: BuildingType) -> f64 {
        match building_type {
            BuildingType::SingleOrTwoFamily => self.single_or_two_family,
            BuildingType::MultipleDwelling => self.multiple_dwelling,
        }
    }
}

/// Rear yard baseline and modifier thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct RearYardTable {
    /// Citation.
    pub section: String,
    /// Link.
    pub url: Option<String>,
    /// Baseline depth in feet.
    pub baseline_ft: f64,
    /// Lots narrower than this may need the deeper rear yard.
    pub narrow_lot_frontage_ft: f64,
    /// The deeper rear yard for narrow lots.
    pub narrow_lot_rear_yard_ft: f64,
    /// Lots shallower than this may qualify for a shallow-lot reduction.
    pub shallow_lot_depth_ft: f64,
}

/// Lot coverage table.
#[derive(Debug, Clone, Deserialize)]
pub struct LotCoverageTable {
    /// Citation for R1-R5.
    pub low_density_section: String,
    /// Link for R1-R5.
    pub low_density_url: Option<String>,
    /// Citation for R6-R12.
    pub medium_high_density_section: String,
    /// Link for R6-R12.
    pub medium_high_density_url: Option<String>,
    /// Districts whose coverage follows from yard rules.
    pub yard_based: Vec<String>,
    /// District -> coverage.
    pub districts: BTreeMap<String, LotCoverageEntry>,
}

/// Coverage percentages for one district.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LotCoverageEntry {
    /// Interior and through lots.
    pub interior: f64,
    /// Corner lots.
    pub corner: f64,
    /// Override for single- and two-family residences.
    pub one_two_family: Option<CoverageValues>,
}

/// Interior and corner coverage percentages.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CoverageValues {
    /// Interior and through lots.
    pub interior: f64,
    /// Corner lots.
    pub corner: f64,
}

/// The three parking regimes.
#[derive(Debug, Clone, Deserialize)]
pub struct ParkingTables {
    /// ZR 25-21.
    pub inner: ParkingRegime,
    /// ZR 25-22.
    pub outer: ParkingRegime,
    /// ZR 25-23.
    pub beyond_gtz: ParkingRegime,
}

/// One parking regime.
#[derive(Debug, Clone, Deserialize)]
pub struct ParkingRegime {
    /// Citation.
    pub section: String,
    /// Link.
    pub url: Option<String>,
    /// Human-readable regime name.
    pub label: String,
    /// District -> requirement.
    pub districts: BTreeMap<String, ParkingEntry>,
}

/// Parking requirement for one district within a regime.
#[derive(Debug, Clone, Deserialize)]
pub struct ParkingEntry {
    /// Spaces per 100 dwelling units.
    pub percent: f64,
    /// Requirements at or below this many spaces are waived.
    pub waiver_max: u32,
    /// Lot-area dependent replacements for `percent`.
    #[serde(default)]
    pub small_lots: Vec<SmallLotModifier>,
}

impl ParkingEntry {
    /// Returns the percentage for a lot of the given area and the
    /// modifier that produced it, if any.
    #[must_use]
    pub fn percent_for_lot(&self, lot_area_sqft: Option<f64>) -> (f64, Option<&SmallLotModifier>) {
        let modifier = lot_area_sqft.and_then(|area| {
            self.small_lots
                .iter()
                .find(|modifier| area <= modifier.max_lot_area_sqft)
        });
        modifier.map_or((self.percent, None), |m| (m.percent, Some(m)))
    }
}

/// Replacement percentage for lots at or below an area threshold.
#[derive(Debug, Clone, Deserialize)]
pub struct SmallLotModifier {
    /// Largest lot area (inclusive) the modifier applies to.
    pub max_lot_area_sqft: f64,
    /// Replacement spaces per 100 dwelling units.
    pub percent: f64,
}

/// How a district resolved against one table.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a, T> {
    /// The normalized district has its own entry.
    Exact {
        /// Matched key.
        key: &'a str,
        /// Entry.
        entry: &'a T,
    },
    /// The base district's entry was used.
    Base {
        /// Matched base key.
        key: &'a str,
        /// Entry.
        entry: &'a T,
        /// The substitution, for the assumptions list.
        assumption: String,
    },
    /// Neither key is in the table.
    Missing {
        /// Names the unmatched district.
        reason: String,
    },
}

impl<'a, T> Lookup<'a, T> {
    /// Returns the entry, if found.
    #[must_use]
    pub const fn entry(&self) -> Option<&'a T> {
        match self {
            Self::Exact { entry, .. } | Self::Base { entry, .. } => Some(*entry),
            Self::Missing { .. } => None,
        }
    }

    /// Returns the substitution assumption, if any.
    #[must_use]
    pub fn assumption(&self) -> Option<&str> {
        match self {
            Self::Base { assumption, .. } => Some(assumption),
            _ => None,
        }
    }
}

/// Resolves a district against a table: exact key, then base district,
/// then miss.
#[must_use]
pub fn lookup<'a, T>(
    districts: &'a BTreeMap<String, T>,
    district: &NormalizedDistrict,
    table_name: &str,
) -> Lookup<'a, T> {
    if let Some((key, entry)) = districts.get_key_value(&district.normalized) {
        return Lookup::Exact {
            key: key.as_str(),
            entry,
        };
    }

    let base = district
        .base_district
        .as_ref()
        .and_then(|base| districts.get_key_value(base));

    if let Some((key, entry)) = base {
        log::debug!(
            "{table_name}: {} not found, using base district {key}",
            district.normalized
        );
        return Lookup::Base {
            key: key.as_str(),
            entry,
            assumption: format!(
                "Using base district {key} for {} in the {table_name} table",
                district.normalized
            ),
        };
    }

    Lookup::Missing {
        reason: format!(
            "District {} is not in the {table_name} table",
            district.normalized
        ),
    }
}

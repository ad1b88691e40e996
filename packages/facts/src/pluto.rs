//! `MapPLUTO` tax lot attributes from the NYC Open Data Socrata API.
//!
//! One row per tax lot. The Socrata JSON export returns every column as a
//! string (numbers included), and blank columns are omitted, so parsing is
//! lenient about representation and strict only about the BBL.

use async_trait::async_trait;
use nyc_zoning_models::{Bbl, Borough};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::{self, ProviderConfig};
use crate::{FactsError, Step, retry};

/// Zoning and lot attributes for one tax lot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelAttributes {
    /// Zoning district codes, `zonedist1` through `zonedist4`.
    pub zoning_districts: Vec<String>,
    /// Commercial overlays, `overlay1` and `overlay2`.
    pub overlays: Vec<String>,
    /// Special purpose districts, `spdist1` through `spdist3`.
    pub special_districts: Vec<String>,
    /// Lot area in square feet.
    pub lot_area_sqft: Option<f64>,
    /// Lot frontage in feet.
    pub lot_frontage_ft: Option<f64>,
    /// Lot depth in feet.
    pub lot_depth_ft: Option<f64>,
    /// Total building floor area in square feet.
    pub building_area_sqft: Option<f64>,
    /// Building class code.
    pub building_class: Option<String>,
    /// Residential unit count.
    pub residential_units: Option<u32>,
    /// Borough.
    pub borough: Option<Borough>,
    /// Community district number within the borough.
    pub community_district: Option<u16>,
}

fn text(row: &Value, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(row: &Value, key: &str) -> Option<f64> {
    text(row, key)?.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn texts(row: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter().filter_map(|key| text(row, key)).collect()
}

/// Parses one Socrata row into [`ParcelAttributes`].
///
/// Unparseable numbers become `None`. Negative values are kept as-is; the
/// engine sanitizes them with a note.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_pluto_row(row: &Value) -> ParcelAttributes {
    ParcelAttributes {
        zoning_districts: texts(row, &["zonedist1", "zonedist2", "zonedist3", "zonedist4"]),
        overlays: texts(row, &["overlay1", "overlay2"]),
        special_districts: texts(row, &["spdist1", "spdist2", "spdist3"]),
        lot_area_sqft: number(row, "lotarea"),
        lot_frontage_ft: number(row, "lotfront"),
        lot_depth_ft: number(row, "lotdepth"),
        building_area_sqft: number(row, "bldgarea"),
        building_class: text(row, "bldgclass"),
        residential_units: number(row, "unitsres")
            .filter(|units| *units >= 0.0)
            .map(|units| units.round() as u32),
        borough: text(row, "borough").and_then(|raw| Borough::parse_loose(&raw)),
        community_district: number(row, "cd")
            .filter(|cd| *cd > 0.0)
            .map(|cd| (cd as u16) % 100),
    }
}

/// Fetches lot attributes from the PLUTO Socrata dataset.
pub struct PlutoStep {
    client: reqwest::Client,
    base_url: String,
    app_token: Option<String>,
}

impl PlutoStep {
    /// Creates a step for the given dataset URL.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        app_token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            app_token,
        }
    }

    /// Creates a step from the `pluto` service configuration. The app
    /// token is optional; without it Socrata applies a lower rate limit.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError::Config`] if the service is misconfigured.
    pub fn from_env(client: reqwest::Client) -> Result<Self, FactsError> {
        let config = services::service("pluto")?;
        let ProviderConfig::Socrata { app_token_env, .. } = &config.provider else {
            return Err(FactsError::Config {
                message: "Service 'pluto' is not a Socrata provider".to_string(),
            });
        };
        let app_token = app_token_env.as_deref().and_then(services::optional_env);
        Ok(Self::new(client, config.resolved_url(), app_token))
    }
}

#[async_trait]
impl Step for PlutoStep {
    type Input = Bbl;
    type Output = ParcelAttributes;

    fn name(&self) -> &str {
        "pluto"
    }

    async fn run(&self, input: &Bbl) -> Result<ParcelAttributes, FactsError> {
        let bbl = input.to_string();
        log::info!("Fetching PLUTO attributes for BBL {bbl}");

        let body = retry::send_json(|| {
            let request = self
                .client
                .get(&self.base_url)
                .query(&[("bbl", bbl.as_str()), ("$limit", "1")]);
            match &self.app_token {
                Some(token) => request.header("X-App-Token", token),
                None => request,
            }
        })
        .await?;

        let rows = body.as_array().ok_or_else(|| FactsError::Parse {
            message: "PLUTO response is not a JSON array".to_string(),
        })?;
        let row = rows.first().ok_or_else(|| FactsError::NotFound {
            message: format!("BBL {bbl} is not in PLUTO"),
        })?;

        let attributes = parse_pluto_row(row);
        log::debug!(
            "PLUTO BBL {bbl}: districts {:?}, lot area {:?}",
            attributes.zoning_districts,
            attributes.lot_area_sqft
        );
        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_string_encoded_row() {
        let row = json!({
            "bbl": "3012340056.00000000",
            "borough": "BK",
            "cd": "308",
            "zonedist1": "R6",
            "zonedist2": "R7A",
            "overlay1": "C2-4",
            "spdist1": "EC-2",
            "lotarea": "2000",
            "lotfront": "20.00",
            "lotdepth": "100.00",
            "bldgarea": "3200",
            "bldgclass": "B1",
            "unitsres": "2"
        });
        let attrs = parse_pluto_row(&row);
        assert_eq!(attrs.zoning_districts, vec!["R6", "R7A"]);
        assert_eq!(attrs.overlays, vec!["C2-4"]);
        assert_eq!(attrs.special_districts, vec!["EC-2"]);
        assert_eq!(attrs.lot_area_sqft, Some(2000.0));
        assert_eq!(attrs.lot_frontage_ft, Some(20.0));
        assert_eq!(attrs.building_class.as_deref(), Some("B1"));
        assert_eq!(attrs.residential_units, Some(2));
        assert_eq!(attrs.borough, Some(Borough::Brooklyn));
        assert_eq!(attrs.community_district, Some(8));
    }

    #[test]
    fn accepts_numeric_columns() {
        let row = json!({ "lotarea": 4000, "unitsres": 0 });
        let attrs = parse_pluto_row(&row);
        assert_eq!(attrs.lot_area_sqft, Some(4000.0));
        assert_eq!(attrs.residential_units, Some(0));
    }

    #[test]
    fn missing_and_blank_columns_are_none() {
        let row = json!({ "zonedist1": " ", "lotarea": "n/a" });
        let attrs = parse_pluto_row(&row);
        assert!(attrs.zoning_districts.is_empty());
        assert_eq!(attrs.lot_area_sqft, None);
        assert_eq!(attrs.building_class, None);
        assert_eq!(attrs, ParcelAttributes::default());
    }
}

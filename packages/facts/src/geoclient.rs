//! NYC Geoclient address geocoder.
//!
//! Resolves a house number, street, and borough to a tax lot, its
//! coordinates, and the corner indicator used for lot type
//! classification.

use async_trait::async_trait;
use nyc_zoning_models::{Bbl, Borough};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::{self, ProviderConfig};
use crate::{FactsError, Step, retry};

/// A street address to geocode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressQuery {
    /// House number (e.g., `"120"`, `"42-15"`).
    pub house_number: String,
    /// Street name.
    pub street: String,
    /// Borough.
    pub borough: Borough,
}

/// The geocoder's answer for one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedLot {
    /// Tax lot the address falls on.
    pub bbl: Bbl,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Community district number within the borough.
    pub community_district: Option<u16>,
    /// Corner indicator (e.g., `"NE"`); absent for interior lots.
    pub corner_code: Option<String>,
}

/// Borough name in the form the Geoclient API accepts.
const fn geoclient_borough(borough: Borough) -> &'static str {
    match borough {
        Borough::Manhattan => "Manhattan",
        Borough::Bronx => "Bronx",
        Borough::Brooklyn => "Brooklyn",
        Borough::Queens => "Queens",
        Borough::StatenIsland => "Staten Island",
    }
}

/// Reads a field that Geoclient returns as either a string or a number.
fn field_str(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_f64(obj: &Value, key: &str) -> Option<f64> {
    field_str(obj, key)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parses an `/address.json` response.
///
/// # Errors
///
/// Returns [`FactsError::NotFound`] if the response carries no tax lot
/// (Geoclient reports unmatched addresses inside a successful response),
/// or [`FactsError::Parse`] if the lot or coordinates are malformed.
pub fn parse_address_response(body: &Value) -> Result<GeocodedLot, FactsError> {
    let address = body.get("address").ok_or_else(|| FactsError::Parse {
        message: "Geoclient response has no 'address' object".to_string(),
    })?;

    let Some(raw_bbl) = field_str(address, "bbl") else {
        let reason = field_str(address, "message")
            .unwrap_or_else(|| "address did not match a tax lot".to_string());
        return Err(FactsError::NotFound { message: reason });
    };

    let bbl: Bbl = raw_bbl.parse().map_err(|e| FactsError::Parse {
        message: format!("{e}"),
    })?;

    let (Some(latitude), Some(longitude)) = (
        field_f64(address, "latitude"),
        field_f64(address, "longitude"),
    ) else {
        return Err(FactsError::Parse {
            message: format!("Geoclient returned BBL {bbl} without coordinates"),
        });
    };

    // Community district arrives as "301" style (borough digit + number)
    // or as the bare number.
    let community_district = field_str(address, "communityDistrict")
        .and_then(|raw| raw.parse::<u16>().ok())
        .map(|cd| if cd >= 100 { cd % 100 } else { cd });

    Ok(GeocodedLot {
        bbl,
        latitude,
        longitude,
        community_district,
        corner_code: field_str(address, "cornerCode"),
    })
}

/// Geocodes addresses against the Geoclient v2 API.
pub struct GeoclientStep {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

impl GeoclientStep {
    /// Creates a step for the given endpoint and subscription key.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            key: key.into(),
        }
    }

    /// Creates a step from the `geoclient` service configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError::Config`] if the subscription key variable is
    /// unset or the service is misconfigured.
    pub fn from_env(client: reqwest::Client) -> Result<Self, FactsError> {
        let config = services::service("geoclient")?;
        let ProviderConfig::Geoclient { key_env, .. } = &config.provider else {
            return Err(FactsError::Config {
                message: "Service 'geoclient' is not a Geoclient provider".to_string(),
            });
        };
        let key = services::required_env(key_env)?;
        Ok(Self::new(client, config.resolved_url(), key))
    }
}

#[async_trait]
impl Step for GeoclientStep {
    type Input = AddressQuery;
    type Output = GeocodedLot;

    fn name(&self) -> &str {
        "geoclient"
    }

    async fn run(&self, input: &AddressQuery) -> Result<GeocodedLot, FactsError> {
        let url = format!("{}/address.json", self.base_url.trim_end_matches('/'));
        log::info!(
            "Geocoding {} {}, {}",
            input.house_number,
            input.street,
            geoclient_borough(input.borough)
        );

        let body = retry::send_json(|| {
            self.client
                .get(&url)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .query(&[
                    ("houseNumber", input.house_number.as_str()),
                    ("street", input.street.as_str()),
                    ("borough", geoclient_borough(input.borough)),
                ])
        })
        .await?;

        let lot = parse_address_response(&body)?;
        log::debug!("Geoclient matched BBL {}", lot.bbl);
        Ok(lot)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_matched_address() {
        let body = json!({
            "address": {
                "bbl": "3012340056",
                "latitude": 40.6782,
                "longitude": -73.9442,
                "communityDistrict": "308",
                "cornerCode": "SE"
            }
        });
        let lot = parse_address_response(&body).unwrap();
        assert_eq!(lot.bbl.to_string(), "3012340056");
        assert!((lot.latitude - 40.6782).abs() < 1e-9);
        assert_eq!(lot.community_district, Some(8));
        assert_eq!(lot.corner_code.as_deref(), Some("SE"));
    }

    #[test]
    fn blank_corner_code_is_interior() {
        let body = json!({
            "address": {
                "bbl": "1008350041",
                "latitude": "40.75",
                "longitude": "-73.99",
                "cornerCode": "  "
            }
        });
        let lot = parse_address_response(&body).unwrap();
        assert_eq!(lot.corner_code, None);
        assert_eq!(lot.community_district, None);
    }

    #[test]
    fn unmatched_address_is_not_found() {
        let body = json!({
            "address": { "message": "NOT A VALID HOUSE NUMBER" }
        });
        let err = parse_address_response(&body).unwrap_err();
        assert!(matches!(err, FactsError::NotFound { ref message } if message.contains("HOUSE")));
    }

    #[test]
    fn missing_coordinates_is_parse_error() {
        let body = json!({ "address": { "bbl": "3012340056" } });
        assert!(matches!(
            parse_address_response(&body),
            Err(FactsError::Parse { .. })
        ));
    }

    #[test]
    fn missing_address_object_is_parse_error() {
        assert!(matches!(
            parse_address_response(&json!({})),
            Err(FactsError::Parse { .. })
        ));
    }
}

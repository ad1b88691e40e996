//! Transit zone lookup for a geocoded point.
//!
//! Two implementations: [`ArcGisTransitStep`] queries a hosted
//! `FeatureServer` layer, [`LocalTransitStep`] answers from a GeoJSON
//! file loaded into an R-tree.

use async_trait::async_trait;
use nyc_zoning_models::TransitZoneQuery;
use nyc_zoning_spatial::TransitZoneIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::{self, ProviderConfig};
use crate::{FactsError, Step, retry};

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

/// Interprets an `ArcGIS` layer query response.
///
/// A response carrying an `error` object is a failed query even though
/// the HTTP status was 200. Only an empty `features` array means no zone
/// contains the point; features that all lack the label attribute are a
/// failed query.
#[must_use]
pub fn parse_arcgis_response(body: &Value, label_field: &str) -> TransitZoneQuery {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("ArcGIS query returned an error")
            .to_string();
        return TransitZoneQuery::Failed { message };
    }

    let Some(features) = body.get("features").and_then(Value::as_array) else {
        return TransitZoneQuery::Failed {
            message: "ArcGIS response has no 'features' array".to_string(),
        };
    };

    if features.is_empty() {
        return TransitZoneQuery::NoFeatures;
    }

    let labels: Vec<String> = features
        .iter()
        .filter_map(|feature| feature.get("attributes")?.get(label_field)?.as_str())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        return TransitZoneQuery::Failed {
            message: format!(
                "{} feature(s) returned without '{label_field}'",
                features.len()
            ),
        };
    }

    TransitZoneQuery::Matched { labels }
}

/// Queries a hosted `ArcGIS` transit zone layer.
pub struct ArcGisTransitStep {
    client: reqwest::Client,
    query_url: String,
    label_field: String,
}

impl ArcGisTransitStep {
    /// Creates a step for the given layer query URL and label attribute.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        query_url: impl Into<String>,
        label_field: impl Into<String>,
    ) -> Self {
        Self {
            client,
            query_url: query_url.into(),
            label_field: label_field.into(),
        }
    }

    /// Creates a step from the `transit_zones` service configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError::Config`] if the service is misconfigured.
    pub fn from_env(client: reqwest::Client) -> Result<Self, FactsError> {
        let config = services::service("transit_zones")?;
        let ProviderConfig::ArcGis { label_field, .. } = &config.provider else {
            return Err(FactsError::Config {
                message: "Service 'transit_zones' is not an ArcGIS provider".to_string(),
            });
        };
        Ok(Self::new(client, config.resolved_url(), label_field.clone()))
    }
}

#[async_trait]
impl Step for ArcGisTransitStep {
    type Input = Coordinates;
    type Output = TransitZoneQuery;

    fn name(&self) -> &str {
        "transit_zone"
    }

    async fn run(&self, input: &Coordinates) -> Result<TransitZoneQuery, FactsError> {
        let geometry = format!("{},{}", input.longitude, input.latitude);
        log::info!("Querying transit zone layer at {geometry}");

        let body = retry::send_json(|| {
            self.client.get(&self.query_url).query(&[
                ("geometry", geometry.as_str()),
                ("geometryType", "esriGeometryPoint"),
                ("inSR", "4326"),
                ("spatialRel", "esriSpatialRelIntersects"),
                ("outFields", self.label_field.as_str()),
                ("returnGeometry", "false"),
                ("f", "json"),
            ])
        })
        .await?;

        Ok(parse_arcgis_response(&body, &self.label_field))
    }
}

/// Answers transit zone queries from an in-memory polygon index.
pub struct LocalTransitStep {
    index: TransitZoneIndex,
}

impl LocalTransitStep {
    /// Wraps a loaded index.
    #[must_use]
    pub const fn new(index: TransitZoneIndex) -> Self {
        Self { index }
    }

    /// Loads a GeoJSON `FeatureCollection` file whose polygons carry the
    /// zone label in `label_property`.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError::Io`] if the file cannot be read, or
    /// [`FactsError::Parse`] if it is not a usable zone map.
    pub fn from_file(
        path: &std::path::Path,
        label_property: &str,
    ) -> Result<Self, FactsError> {
        let contents = std::fs::read_to_string(path)?;
        let index = TransitZoneIndex::from_geojson_str(&contents, label_property).map_err(
            |e| FactsError::Parse {
                message: format!("{}: {e}", path.display()),
            },
        )?;
        log::info!(
            "Loaded {} transit zone polygons from {}",
            index.len(),
            path.display()
        );
        Ok(Self::new(index))
    }
}

#[async_trait]
impl Step for LocalTransitStep {
    type Input = Coordinates;
    type Output = TransitZoneQuery;

    fn name(&self) -> &str {
        "transit_zone"
    }

    async fn run(&self, input: &Coordinates) -> Result<TransitZoneQuery, FactsError> {
        Ok(self.index.lookup(input.longitude, input.latitude))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_matched_features() {
        let body = json!({
            "features": [
                { "attributes": { "TZ_Name": "Inner Transit Zone" } },
                { "attributes": { "OTHER": "x" } }
            ]
        });
        assert_eq!(
            parse_arcgis_response(&body, "TZ_Name"),
            TransitZoneQuery::Matched {
                labels: vec!["Inner Transit Zone".to_string()]
            }
        );
    }

    #[test]
    fn unlabelled_features_are_failed() {
        let body = json!({
            "features": [{ "attributes": { "OBJECTID": 7 } }]
        });
        let query = parse_arcgis_response(&body, "TZ_Name");
        assert!(
            matches!(query, TransitZoneQuery::Failed { ref message } if message.contains("TZ_Name"))
        );
        assert_eq!(
            nyc_zoning::classify::classify_transit_zone(&query),
            nyc_zoning_models::TransitZone::Unknown
        );
    }

    #[test]
    fn empty_features_is_no_features() {
        let body = json!({ "features": [] });
        assert_eq!(
            parse_arcgis_response(&body, "TZ_Name"),
            TransitZoneQuery::NoFeatures
        );
    }

    #[test]
    fn error_object_is_failed() {
        let body = json!({ "error": { "code": 400, "message": "Invalid query" } });
        assert_eq!(
            parse_arcgis_response(&body, "TZ_Name"),
            TransitZoneQuery::Failed {
                message: "Invalid query".to_string()
            }
        );
    }

    #[test]
    fn missing_features_is_failed() {
        assert!(matches!(
            parse_arcgis_response(&json!({}), "TZ_Name"),
            TransitZoneQuery::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn local_step_uses_index() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "label": "Outer Transit Zone" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-74.1, 40.6], [-73.8, 40.6], [-73.8, 40.9], [-74.1, 40.9], [-74.1, 40.6]]]
                }
            }]
        }"#;
        let step = LocalTransitStep::new(TransitZoneIndex::from_geojson_str(geojson, "label").unwrap());

        let inside = step
            .run(&Coordinates {
                longitude: -73.95,
                latitude: 40.75,
            })
            .await
            .unwrap();
        assert_eq!(
            inside,
            TransitZoneQuery::Matched {
                labels: vec!["Outer Transit Zone".to_string()]
            }
        );

        let outside = step
            .run(&Coordinates {
                longitude: -75.0,
                latitude: 40.75,
            })
            .await
            .unwrap();
        assert_eq!(outside, TransitZoneQuery::NoFeatures);
    }
}

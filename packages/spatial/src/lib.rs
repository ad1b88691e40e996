#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index for transit zone attribution.
//!
//! Loads the transit zone polygons from a `GeoJSON` feature collection,
//! builds an R-tree over their bounding boxes, and answers point-in-polygon
//! queries with the same [`TransitZoneQuery`] outcome the remote map
//! service produces. Used by the fact pipeline when a local copy of the
//! zone map is available.

use geo::{BoundingRect, Contains, MultiPolygon};
use geojson::GeoJson;
use nyc_zoning_models::TransitZoneQuery;
use rstar::{AABB, RTree, RTreeObject};

/// Errors raised while building a [`TransitZoneIndex`].
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// The input is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The input is valid `GeoJSON` but not a usable polygon layer.
    #[error("Geometry error: {message}")]
    Geometry {
        /// What was wrong.
        message: String,
    },

    /// A feature has no string value for the label property.
    #[error("Feature {index} has no '{property}' property")]
    MissingProperty {
        /// Position of the feature in the collection.
        index: usize,
        /// The expected property name.
        property: String,
    },
}

/// A zone polygon stored in the R-tree with its label.
struct ZoneEntry {
    /// Position in the source collection, used to keep results in file
    /// order.
    index: usize,
    label: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built R-tree of transit zone polygons.
pub struct TransitZoneIndex {
    zones: RTree<ZoneEntry>,
}

impl TransitZoneIndex {
    /// Builds the index from a `GeoJSON` `FeatureCollection` whose features
    /// are `Polygon` or `MultiPolygon` geometries labeled by the string
    /// property `label_property`.
    ///
    /// Features without geometry, or with non-polygon geometry, are skipped
    /// with a warning.
    ///
    /// # Errors
    ///
    /// * [`SpatialError::GeoJson`] if the input does not parse
    /// * [`SpatialError::Geometry`] if the input is not a feature collection
    /// * [`SpatialError::MissingProperty`] if a polygon feature has no label
    pub fn from_geojson_str(geojson_str: &str, label_property: &str) -> Result<Self, SpatialError> {
        let GeoJson::FeatureCollection(collection) = geojson_str.parse::<GeoJson>()? else {
            return Err(SpatialError::Geometry {
                message: "expected a FeatureCollection".to_string(),
            });
        };

        let mut entries = Vec::with_capacity(collection.features.len());

        for (index, feature) in collection.features.into_iter().enumerate() {
            let label = feature
                .property(label_property)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);

            let Some(geometry) = feature.geometry else {
                log::warn!("Transit zone feature {index} has no geometry, skipping");
                continue;
            };
            let Some(polygon) = to_multipolygon(geometry) else {
                log::warn!("Transit zone feature {index} is not a polygon, skipping");
                continue;
            };
            let Some(label) = label else {
                return Err(SpatialError::MissingProperty {
                    index,
                    property: label_property.to_string(),
                });
            };

            entries.push(ZoneEntry {
                index,
                label,
                envelope: compute_envelope(&polygon),
                polygon,
            });
        }

        log::debug!("Loaded {} transit zone polygons into spatial index", entries.len());

        Ok(Self {
            zones: RTree::bulk_load(entries),
        })
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.size()
    }

    /// Whether the index holds no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.size() == 0
    }

    /// Labels of every polygon containing the point, in source order.
    #[must_use]
    pub fn labels_at(&self, lng: f64, lat: f64) -> Vec<&str> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        let mut hits: Vec<&ZoneEntry> = self
            .zones
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .collect();
        hits.sort_by_key(|entry| entry.index);

        hits.into_iter().map(|entry| entry.label.as_str()).collect()
    }

    /// Looks up the zones containing a point.
    ///
    /// A point outside every polygon is [`TransitZoneQuery::NoFeatures`];
    /// the caller maps that to "beyond the Greater Transit Zone".
    #[must_use]
    pub fn lookup(&self, lng: f64, lat: f64) -> TransitZoneQuery {
        if !lng.is_finite() || !lat.is_finite() {
            return TransitZoneQuery::Failed {
                message: format!("invalid coordinates ({lng}, {lat})"),
            };
        }

        let labels = self.labels_at(lng, lat);
        if labels.is_empty() {
            TransitZoneQuery::NoFeatures
        } else {
            TransitZoneQuery::Matched {
                labels: labels.into_iter().map(str::to_string).collect(),
            }
        }
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Computes the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

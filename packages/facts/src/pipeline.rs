//! Sequential fact collection: geocode, fetch lot attributes, look up the
//! transit zone, merge.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nyc_zoning::classify::classify_transit_zone;
use nyc_zoning_models::{Bbl, ParcelFacts, TransitZoneQuery};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::geoclient::{AddressQuery, GeoclientStep, GeocodedLot};
use crate::pluto::{ParcelAttributes, PlutoStep};
use crate::transit::{ArcGisTransitStep, Coordinates, LocalTransitStep};
use crate::{FactsError, ReportStore, Step, retry};

/// A step that geocodes an address.
pub type GeocoderStep = dyn Step<Input = AddressQuery, Output = GeocodedLot>;
/// A step that fetches lot attributes by BBL.
pub type RegistryStep = dyn Step<Input = Bbl, Output = ParcelAttributes>;
/// A step that finds the transit zone at a point.
pub type TransitStep = dyn Step<Input = Coordinates, Output = TransitZoneQuery>;

/// Everything collected for one report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedFacts {
    /// Report the outputs are stored under.
    pub report_id: String,
    /// When collection finished.
    pub collected_at: DateTime<Utc>,
    /// Geocoder output.
    pub geocoded: GeocodedLot,
    /// Parcel registry output.
    pub parcel: ParcelAttributes,
    /// Raw transit zone query outcome.
    pub transit_query: TransitZoneQuery,
    /// Merged facts ready for evaluation.
    pub facts: ParcelFacts,
}

/// Returns a fresh random report id.
#[must_use]
pub fn new_report_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Merges step outputs into the engine's input.
#[must_use]
pub fn merge(
    geocoded: &GeocodedLot,
    parcel: &ParcelAttributes,
    transit_query: &TransitZoneQuery,
) -> ParcelFacts {
    ParcelFacts {
        bbl: Some(geocoded.bbl),
        zoning_districts: parcel.zoning_districts.clone(),
        overlays: parcel.overlays.clone(),
        special_districts: parcel.special_districts.clone(),
        lot_area_sqft: parcel.lot_area_sqft,
        lot_frontage_ft: parcel.lot_frontage_ft,
        lot_depth_ft: parcel.lot_depth_ft,
        existing_floor_area_sqft: parcel.building_area_sqft,
        building_class: parcel.building_class.clone(),
        existing_units: parcel.residential_units,
        borough: parcel.borough.or(Some(geocoded.bbl.borough)),
        community_district: geocoded.community_district.or(parcel.community_district),
        corner_code: geocoded.corner_code.clone(),
        geocoder_record_present: true,
        transit_zone: classify_transit_zone(transit_query),
        flood_zone: None,
    }
}

/// Runs the fact-collection steps in order against a [`ReportStore`].
pub struct FactsPipeline {
    geocoder: Box<GeocoderStep>,
    registry: Box<RegistryStep>,
    transit: Box<TransitStep>,
    store: Arc<dyn ReportStore>,
}

impl FactsPipeline {
    /// Creates a pipeline from explicit steps.
    #[must_use]
    pub fn new(
        geocoder: Box<GeocoderStep>,
        registry: Box<RegistryStep>,
        transit: Box<TransitStep>,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            geocoder,
            registry,
            transit,
            store,
        }
    }

    /// Creates a pipeline against the configured upstream services. When
    /// `local_transit` is given it replaces the remote transit zone query.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError::Config`] if a required secret or service
    /// configuration is missing, or [`FactsError::Http`] if the HTTP client
    /// cannot be built.
    pub fn from_env(
        store: Arc<dyn ReportStore>,
        local_transit: Option<LocalTransitStep>,
    ) -> Result<Self, FactsError> {
        let client = retry::client()?;
        let transit: Box<TransitStep> = match local_transit {
            Some(step) => Box::new(step),
            None => Box::new(ArcGisTransitStep::from_env(client.clone())?),
        };
        Ok(Self::new(
            Box::new(GeoclientStep::from_env(client.clone())?),
            Box::new(PlutoStep::from_env(client)?),
            transit,
            store,
        ))
    }

    /// Collects facts for one address under `report_id`.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError::Step`] if geocoding fails,
    /// [`FactsError::NotFound`] if the lot is not in the parcel registry,
    /// and [`FactsError::Step`] for other registry failures. Transit zone
    /// failures are not errors; they are recorded as
    /// [`TransitZoneQuery::Failed`].
    pub async fn collect(
        &self,
        report_id: &str,
        address: &AddressQuery,
    ) -> Result<CollectedFacts, FactsError> {
        log::info!("Collecting facts for report {report_id}");

        let geocoded = self
            .run_cached(report_id, self.geocoder.as_ref(), address, |_| true)
            .await
            .map_err(|e| wrap_step(self.geocoder.name(), e))?;

        let parcel = match self
            .run_cached(report_id, self.registry.as_ref(), &geocoded.bbl, |_| true)
            .await
        {
            Ok(parcel) => parcel,
            Err(e @ FactsError::NotFound { .. }) => return Err(e),
            Err(e) => return Err(wrap_step(self.registry.name(), e)),
        };

        let coordinates = Coordinates {
            longitude: geocoded.longitude,
            latitude: geocoded.latitude,
        };
        let transit_query = self
            .run_cached(report_id, self.transit.as_ref(), &coordinates, |query| {
                !matches!(query, TransitZoneQuery::Failed { .. })
            })
            .await
            .unwrap_or_else(|e| TransitZoneQuery::Failed {
                message: e.to_string(),
            });
        if let TransitZoneQuery::Failed { message } = &transit_query {
            log::warn!("Transit zone lookup failed: {message}");
        }

        let facts = merge(&geocoded, &parcel, &transit_query);

        Ok(CollectedFacts {
            report_id: report_id.to_string(),
            collected_at: Utc::now(),
            geocoded,
            parcel,
            transit_query,
            facts,
        })
    }

    /// Returns the stored output of `step` if present and readable,
    /// otherwise runs the step and stores outputs accepted by `cacheable`.
    async fn run_cached<I, O>(
        &self,
        report_id: &str,
        step: &dyn Step<Input = I, Output = O>,
        input: &I,
        cacheable: impl Fn(&O) -> bool + Send,
    ) -> Result<O, FactsError>
    where
        I: Send + Sync,
        O: Serialize + DeserializeOwned + Send,
    {
        let name = step.name();

        if let Some(cached) = self.store.get(report_id, name).await? {
            match serde_json::from_value::<O>(cached) {
                Ok(output) => {
                    log::info!("  {name}: using stored output");
                    return Ok(output);
                }
                Err(e) => log::warn!("  {name}: stored output is unreadable ({e}), re-running"),
            }
        }

        log::info!("  {name}: running");
        let output = step.run(input).await?;

        if cacheable(&output) {
            self.store
                .put(report_id, name, serde_json::to_value(&output)?)
                .await?;
        }

        Ok(output)
    }
}

fn wrap_step(step: &str, source: FactsError) -> FactsError {
    FactsError::Step {
        step: step.to_string(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use nyc_zoning_models::{Borough, TransitZone};
    use serde_json::json;

    use super::*;
    use crate::MemoryReportStore;

    struct FakeGeocoder {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Step for FakeGeocoder {
        type Input = AddressQuery;
        type Output = GeocodedLot;

        fn name(&self) -> &str {
            "geoclient"
        }

        async fn run(&self, _input: &AddressQuery) -> Result<GeocodedLot, FactsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FactsError::NotFound {
                    message: "no such address".to_string(),
                });
            }
            Ok(GeocodedLot {
                bbl: "3012340056".parse().unwrap(),
                latitude: 40.68,
                longitude: -73.94,
                community_district: Some(8),
                corner_code: Some("SE".to_string()),
            })
        }
    }

    struct FakeRegistry {
        found: bool,
    }

    #[async_trait]
    impl Step for FakeRegistry {
        type Input = Bbl;
        type Output = ParcelAttributes;

        fn name(&self) -> &str {
            "pluto"
        }

        async fn run(&self, input: &Bbl) -> Result<ParcelAttributes, FactsError> {
            if !self.found {
                return Err(FactsError::NotFound {
                    message: format!("BBL {input} is not in PLUTO"),
                });
            }
            Ok(ParcelAttributes {
                zoning_districts: vec!["R6".to_string()],
                lot_area_sqft: Some(4000.0),
                building_class: Some("A1".to_string()),
                residential_units: Some(1),
                borough: Some(Borough::Brooklyn),
                ..ParcelAttributes::default()
            })
        }
    }

    struct FakeTransit {
        result: Option<TransitZoneQuery>,
    }

    #[async_trait]
    impl Step for FakeTransit {
        type Input = Coordinates;
        type Output = TransitZoneQuery;

        fn name(&self) -> &str {
            "transit_zone"
        }

        async fn run(&self, _input: &Coordinates) -> Result<TransitZoneQuery, FactsError> {
            self.result.clone().ok_or_else(|| FactsError::Parse {
                message: "layer unavailable".to_string(),
            })
        }
    }

    fn address() -> AddressQuery {
        AddressQuery {
            house_number: "120".to_string(),
            street: "Example Street".to_string(),
            borough: Borough::Brooklyn,
        }
    }

    fn pipeline(
        calls: &Arc<AtomicUsize>,
        geocoder_fails: bool,
        registry_found: bool,
        transit: Option<TransitZoneQuery>,
        store: Arc<MemoryReportStore>,
    ) -> FactsPipeline {
        FactsPipeline::new(
            Box::new(FakeGeocoder {
                calls: Arc::clone(calls),
                fail: geocoder_fails,
            }),
            Box::new(FakeRegistry {
                found: registry_found,
            }),
            Box::new(FakeTransit { result: transit }),
            store,
        )
    }

    fn inner() -> Option<TransitZoneQuery> {
        Some(TransitZoneQuery::Matched {
            labels: vec!["Inner Transit Zone".to_string()],
        })
    }

    #[tokio::test]
    async fn merges_step_outputs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryReportStore::new());
        let collected = pipeline(&calls, false, true, inner(), store)
            .collect("r1", &address())
            .await
            .unwrap();

        let facts = &collected.facts;
        assert_eq!(facts.bbl.map(|b| b.to_string()).as_deref(), Some("3012340056"));
        assert_eq!(facts.zoning_districts, vec!["R6".to_string()]);
        assert_eq!(facts.lot_area_sqft, Some(4000.0));
        assert_eq!(facts.existing_units, Some(1));
        assert_eq!(facts.corner_code.as_deref(), Some("SE"));
        assert_eq!(facts.community_district, Some(8));
        assert!(facts.geocoder_record_present);
        assert_eq!(facts.transit_zone, TransitZone::Inner);
        assert_eq!(collected.report_id, "r1");
    }

    #[tokio::test]
    async fn stored_outputs_skip_rerunning() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryReportStore::new());
        let pipeline = pipeline(&calls, false, true, inner(), Arc::clone(&store));

        pipeline.collect("r1", &address()).await.unwrap();
        pipeline.collect("r1", &address()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        pipeline.collect("r2", &address()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreadable_stored_output_is_replaced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryReportStore::new());
        store
            .put("r1", "geoclient", json!({"unexpected": true}))
            .await
            .unwrap();

        let pipeline = pipeline(&calls, false, true, inner(), Arc::clone(&store));
        pipeline.collect("r1", &address()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stored = store.get("r1", "geoclient").await.unwrap().unwrap();
        assert!(stored.get("bbl").is_some());
    }

    #[tokio::test]
    async fn geocoder_failure_is_step_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryReportStore::new());
        let err = pipeline(&calls, true, true, inner(), store)
            .collect("r1", &address())
            .await
            .unwrap_err();
        assert!(matches!(err, FactsError::Step { ref step, .. } if step == "geoclient"));
    }

    #[tokio::test]
    async fn registry_miss_is_not_found() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryReportStore::new());
        let err = pipeline(&calls, false, false, inner(), store)
            .collect("r1", &address())
            .await
            .unwrap_err();
        assert!(matches!(err, FactsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn transit_failure_becomes_unknown_and_is_not_stored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryReportStore::new());
        let collected = pipeline(&calls, false, true, None, Arc::clone(&store))
            .collect("r1", &address())
            .await
            .unwrap();

        assert!(matches!(
            collected.transit_query,
            TransitZoneQuery::Failed { .. }
        ));
        assert_eq!(collected.facts.transit_zone, TransitZone::Unknown);
        assert_eq!(store.get("r1", "transit_zone").await.unwrap(), None);
    }

    #[tokio::test]
    async fn no_features_is_beyond_gtz() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryReportStore::new());
        let collected = pipeline(
            &calls,
            false,
            true,
            Some(TransitZoneQuery::NoFeatures),
            store,
        )
        .collect("r1", &address())
        .await
        .unwrap();
        assert_eq!(collected.facts.transit_zone, TransitZone::BeyondGtz);
    }

    #[test]
    fn report_ids_are_unique() {
        assert_ne!(new_report_id(), new_report_id());
    }
}

//! Per-report storage of step outputs.
//!
//! The pipeline consults the store before running a step and writes each
//! step's output after, so re-collecting a report reuses what earlier runs
//! already fetched.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::FactsError;

/// Key-value storage scoped by report id.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Returns the stored value for `key` in `report_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError`] if the backing store cannot be read.
    async fn get(&self, report_id: &str, key: &str) -> Result<Option<Value>, FactsError>;

    /// Stores `value` under `key` in `report_id`, replacing any previous
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError`] if the backing store cannot be written.
    async fn put(&self, report_id: &str, key: &str, value: Value) -> Result<(), FactsError>;
}

/// A [`ReportStore`] that lives for the process.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    entries: RwLock<BTreeMap<(String, String), Value>>,
}

impl MemoryReportStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all reports.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn get(&self, report_id: &str, key: &str) -> Result<Option<Value>, FactsError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(report_id.to_string(), key.to_string()))
            .cloned())
    }

    async fn put(&self, report_id: &str, key: &str, value: Value) -> Result<(), FactsError> {
        self.entries
            .write()
            .await
            .insert((report_id.to_string(), key.to_string()), value);
        Ok(())
    }
}

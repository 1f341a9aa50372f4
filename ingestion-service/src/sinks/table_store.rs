use std::collections::BTreeMap;

use energy_client::domain::{EnergyRecord, EnergyRecordKey};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::pipeline::PipelineError;

/// Inclusive timestamp window for range reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimeRange {
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Keyed record store. `put_item` replaces any record with the same
/// `(site_id, timestamp)` key.
#[async_trait::async_trait]
pub trait TableStore: Send + Sync {
    async fn put_item(&self, record: &EnergyRecord) -> Result<(), PipelineError>;

    async fn query(
        &self,
        site_id: &str,
        range: Option<TimeRange>,
    ) -> Result<Vec<EnergyRecord>, PipelineError>;

    async fn scan(&self) -> Result<Vec<EnergyRecord>, PipelineError>;

    /// Anomalous records of one site. Stores without a way to filter on the
    /// flag read the site and filter here.
    async fn query_anomalies(&self, site_id: &str) -> Result<Vec<EnergyRecord>, PipelineError> {
        let records = self.query(site_id, None).await?;
        Ok(records.into_iter().filter(|r| r.anomaly).collect())
    }
}

#[derive(Default)]
pub struct MemoryTableStore {
    items: RwLock<BTreeMap<EnergyRecordKey, EnergyRecord>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn get(&self, key: &EnergyRecordKey) -> Option<EnergyRecord> {
        self.items.read().await.get(key).cloned()
    }
}

#[async_trait::async_trait]
impl TableStore for MemoryTableStore {
    async fn put_item(&self, record: &EnergyRecord) -> Result<(), PipelineError> {
        self.items.write().await.insert(record.key(), record.clone());
        Ok(())
    }

    async fn query(
        &self,
        site_id: &str,
        range: Option<TimeRange>,
    ) -> Result<Vec<EnergyRecord>, PipelineError> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|r| r.site_id == site_id)
            .filter(|r| range.map_or(true, |w| w.contains(r.timestamp)))
            .cloned()
            .collect())
    }

    async fn scan(&self) -> Result<Vec<EnergyRecord>, PipelineError> {
        Ok(self.items.read().await.values().cloned().collect())
    }
}

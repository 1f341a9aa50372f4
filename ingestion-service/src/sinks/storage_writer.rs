use std::{sync::Arc, time::Duration};

use energy_client::domain::EnergyRecord;

use crate::pipeline::PipelineError;
use crate::sinks::table_store::TableStore;

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Idempotent keyed write of persisted records.
///
/// A write that does not finish within the timeout is a storage error.
/// There is no retry here: a failed write fails the message and the queue
/// redelivers it, which is safe because the write replaces by key.
#[derive(Clone)]
pub struct StorageWriter {
    table: Arc<dyn TableStore>,
    timeout: Duration,
}

impl StorageWriter {
    pub fn new(table: Arc<dyn TableStore>) -> Self {
        Self {
            table,
            timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn upsert(&self, record: &EnergyRecord) -> Result<(), PipelineError> {
        let res = match tokio::time::timeout(self.timeout, self.table.put_item(record)).await {
            Ok(res) => res,
            Err(_) => Err(PipelineError::Storage(format!(
                "write timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        match res {
            Ok(()) => {
                metrics::counter!("energy_records_written_total").increment(1);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    site_id = %record.site_id,
                    timestamp = %record.timestamp_text(),
                    "table store write failed"
                );
                metrics::counter!("table_store_errors_total").increment(1);
                Err(match e {
                    e @ PipelineError::Storage(_) => e,
                    other => PipelineError::Storage(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::table_store::{MemoryTableStore, TimeRange};
    use time::macros::datetime;

    /// Never answers a write.
    struct StalledTable;

    #[async_trait::async_trait]
    impl TableStore for StalledTable {
        async fn put_item(&self, _record: &EnergyRecord) -> Result<(), PipelineError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn query(
            &self,
            _site_id: &str,
            _range: Option<TimeRange>,
        ) -> Result<Vec<EnergyRecord>, PipelineError> {
            Ok(Vec::new())
        }

        async fn scan(&self) -> Result<Vec<EnergyRecord>, PipelineError> {
            Ok(Vec::new())
        }
    }

    fn record() -> EnergyRecord {
        EnergyRecord {
            site_id: "site1".to_string(),
            timestamp: datetime!(2025-02-17 04:10:43 UTC),
            energy_generated_kwh: 2.0,
            energy_consumed_kwh: 1.0,
            net_energy_kwh: 1.0,
            anomaly: false,
        }
    }

    #[tokio::test]
    async fn stalled_write_becomes_storage_error() {
        let writer = StorageWriter::new(Arc::new(StalledTable)).with_timeout(Duration::from_millis(50));

        let res = writer.upsert(&record()).await;
        assert!(matches!(res, Err(PipelineError::Storage(msg)) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn upsert_writes_through() {
        let table = Arc::new(MemoryTableStore::new());
        let writer = StorageWriter::new(table.clone());

        writer.upsert(&record()).await.unwrap();
        assert_eq!(table.len().await, 1);
    }
}

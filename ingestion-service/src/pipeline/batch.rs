use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures::{stream, StreamExt};
use serde::Serialize;

use crate::pipeline::{Envelope, PipelineError, Transform};
use crate::sinks::{AnomalyNotifier, StorageWriter, TableStore};
use crate::sources::{
    blob_store::BlobStore,
    queue::{parse_blob_refs, QueueMessage},
};
use crate::transform::TelemetryTransform;

/// Remote-service handles shared by every message of every batch.
#[derive(Clone)]
pub struct Collaborators {
    pub blobs: Arc<dyn BlobStore>,
    pub table: Arc<dyn TableStore>,
    pub notifier: AnomalyNotifier,
}

/// Ids of the messages the queue should redeliver. Anything not listed is
/// treated as fully processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub failed_message_ids: Vec<String>,
}

impl BatchResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed_message_ids.is_empty()
    }
}

/// What a successfully processed message did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageOutcome {
    pub records: usize,
    pub anomalies: usize,
    pub notify_failures: usize,
}

pub struct BatchProcessor {
    blobs: Arc<dyn BlobStore>,
    writer: StorageWriter,
    notifier: AnomalyNotifier,
    transform: TelemetryTransform,
    max_concurrency: usize,
}

impl BatchProcessor {
    pub fn new(collaborators: Collaborators, max_concurrency: usize) -> Self {
        Self {
            blobs: collaborators.blobs,
            writer: StorageWriter::new(collaborators.table),
            notifier: collaborators.notifier,
            transform: TelemetryTransform,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.writer = self.writer.with_timeout(timeout);
        self
    }

    /// Process every message of a delivery and report the ones that failed.
    ///
    /// Messages are independent and run with bounded fan-out; a failing
    /// message never stops the others. Completion order is not preserved.
    pub async fn process_batch(&self, messages: Vec<QueueMessage>) -> BatchResult {
        let total = messages.len();
        metrics::counter!("queue_messages_received_total").increment(total as u64);

        let results: Vec<(String, Result<MessageOutcome, PipelineError>)> = stream::iter(messages)
            .map(|message| async move {
                let res = self.process_message(&message).await;
                (message.message_id, res)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut failed_message_ids = Vec::new();
        for (message_id, res) in results {
            match res {
                Ok(outcome) => {
                    tracing::debug!(
                        %message_id,
                        records = outcome.records,
                        anomalies = outcome.anomalies,
                        notify_failures = outcome.notify_failures,
                        "message processed"
                    );
                }
                Err(e) => {
                    tracing::error!(%message_id, error = %e, "message processing failed");
                    metrics::counter!("queue_messages_failed_total", "kind" => e.kind()).increment(1);
                    failed_message_ids.push(message_id);
                }
            }
        }

        tracing::info!(
            total,
            failed = failed_message_ids.len(),
            "batch processed"
        );

        BatchResult { failed_message_ids }
    }

    /// Fetch, transform, write and (for anomalies) notify every blob a message
    /// references.
    ///
    /// Any error before the write is returned and fails the message.
    /// Notification errors are logged and counted only; the write already
    /// happened.
    pub async fn process_message(&self, message: &QueueMessage) -> Result<MessageOutcome, PipelineError> {
        let received_at = SystemTime::now();
        let refs = parse_blob_refs(&message.body)?;
        let mut outcome = MessageOutcome::default();

        if refs.is_empty() {
            tracing::info!(message_id = %message.message_id, "test notification, nothing to ingest");
            return Ok(outcome);
        }

        for blob in refs {
            tracing::debug!(message_id = %message.message_id, %blob, "fetching blob");
            let payload = self.blobs.get(&blob).await?;

            let env = self
                .transform
                .apply(Envelope { payload, received_at })
                .await?;
            let record = &env.payload;

            self.writer.upsert(record).await?;
            outcome.records += 1;

            if let Ok(dur) = SystemTime::now().duration_since(env.received_at) {
                metrics::histogram!("ingest_end_to_end_latency_seconds").record(dur.as_secs_f64());
            }

            if record.anomaly {
                outcome.anomalies += 1;
                if let Err(e) = self
                    .notifier
                    .notify_anomaly(&record.site_id, record.timestamp)
                    .await
                {
                    outcome.notify_failures += 1;
                    metrics::counter!("anomaly_notify_failures_total").increment(1);
                    tracing::error!(
                        error = %e,
                        site_id = %record.site_id,
                        timestamp = %record.timestamp_text(),
                        "anomaly notification failed"
                    );
                }
            }
        }

        Ok(outcome)
    }
}

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::pipeline::{BatchProcessor, BatchResult};
use crate::sources::queue::QueueMessage;

/// A queue delivery as pushed to `POST /ingest/batch`.
///
/// Entries are decoded one by one so a single unreadable entry does not
/// reject the rest of the delivery.
#[derive(Debug, Deserialize)]
pub struct QueueDelivery {
    #[serde(rename = "Records", default)]
    pub records: Vec<serde_json::Value>,
}

impl QueueDelivery {
    /// Decodable messages. Entries without a usable `messageId` cannot be
    /// reported back as failures; they are logged and counted.
    pub fn into_messages(self) -> Vec<QueueMessage> {
        self.records
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value::<QueueMessage>(raw) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::error!(index, error = %e, "dropping unidentifiable queue entry");
                    metrics::counter!("queue_entries_undecodable_total").increment(1);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

/// Partial-batch answer: only the listed messages are redelivered.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResponse {
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<BatchItemFailure>,
}

impl From<BatchResult> for BatchResponse {
    fn from(result: BatchResult) -> Self {
        Self {
            batch_item_failures: result
                .failed_message_ids
                .into_iter()
                .map(|item_identifier| BatchItemFailure { item_identifier })
                .collect(),
        }
    }
}

pub fn router(processor: Arc<BatchProcessor>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/ingest/batch", post(ingest_batch))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(processor)
}

async fn ingest_batch(
    State(processor): State<Arc<BatchProcessor>>,
    Json(delivery): Json<QueueDelivery>,
) -> Json<BatchResponse> {
    metrics::counter!("http_ingest_requests_total").increment(1);

    let result = processor.process_batch(delivery.into_messages()).await;
    Json(result.into())
}

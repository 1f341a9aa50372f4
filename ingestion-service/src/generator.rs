use energy_client::domain::RawTelemetryEvent;
use rand::Rng;
use time::OffsetDateTime;

use crate::pipeline::PipelineError;
use crate::sources::{queue::object_created_body, BlobRef, BlobStore};

pub const DEFAULT_SITES: [&str; 10] = [
    "site1", "site2", "site3", "site4", "site5", "site6", "site7", "site8", "site9", "site10",
];

/// Readings above this are never generated.
pub const MAX_KWH: f64 = 100.0;

/// Chance that a field is replaced by the `-1` bad-reading marker.
pub const SENTINEL_PROBABILITY: f64 = 0.2;

pub const SENTINEL: f64 = -1.0;

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// One reading per site at `timestamp`, values uniform in `[0, 100]` with four
/// decimals; each field independently becomes the sentinel with 20% chance.
pub fn generate_events<R: Rng + ?Sized>(
    rng: &mut R,
    sites: &[&str],
    timestamp: OffsetDateTime,
) -> Vec<RawTelemetryEvent> {
    sites
        .iter()
        .map(|site| {
            let mut generated = round4(rng.gen_range(0.0..=MAX_KWH));
            let mut consumed = round4(rng.gen_range(0.0..=MAX_KWH));

            if rng.gen_bool(SENTINEL_PROBABILITY) {
                consumed = SENTINEL;
            }
            if rng.gen_bool(SENTINEL_PROBABILITY) {
                generated = SENTINEL;
            }

            RawTelemetryEvent {
                site_id: site.to_string(),
                timestamp,
                energy_generated_kwh: generated,
                energy_consumed_kwh: consumed,
            }
        })
        .collect()
}

/// Upload each event as a pretty-printed JSON blob under its blob key and
/// return the object-created notification for each upload. Stops at the
/// first failed upload.
pub async fn upload_events(
    store: &dyn BlobStore,
    bucket: &str,
    events: &[RawTelemetryEvent],
) -> Result<Vec<serde_json::Value>, PipelineError> {
    let mut notifications = Vec::with_capacity(events.len());

    for event in events {
        let blob = BlobRef {
            bucket: bucket.to_string(),
            key: event.blob_key(),
        };
        let body = serde_json::to_vec_pretty(event)
            .map_err(|e| PipelineError::Malformed(e.to_string()))?;

        if let Err(e) = store.put(&blob, body).await {
            tracing::error!(%blob, error = %e, "upload failed");
            return Err(e);
        }
        tracing::info!(%blob, "uploaded telemetry event");
        notifications.push(object_created_body(&blob));
    }

    Ok(notifications)
}

use crate::pipeline::{Envelope, PipelineError, Transform};
use energy_client::domain::{EnergyRecord, RawTelemetryEvent};
use time::UtcOffset;

/// A reading is anomalous when either energy value is negative.
pub fn is_anomaly(generated_kwh: f64, consumed_kwh: f64) -> bool {
    generated_kwh < 0.0 || consumed_kwh < 0.0
}

/// Decode a raw event blob.
///
/// Rules:
/// - all four fields are required; energy values must be JSON numbers.
/// - timestamp must be RFC 3339.
/// - site_id must not be blank.
pub fn parse_event(payload: &[u8]) -> Result<RawTelemetryEvent, PipelineError> {
    let event: RawTelemetryEvent =
        serde_json::from_slice(payload).map_err(|e| PipelineError::Malformed(e.to_string()))?;

    if event.site_id.trim().is_empty() {
        return Err(PipelineError::Malformed("site_id must not be empty".to_string()));
    }

    Ok(event)
}

/// Build the persisted record for an event.
///
/// The timestamp is normalized to UTC. Net energy is a plain subtraction: sentinel `-1` readings flow into the
/// stored value and the anomaly flag marks them.
pub fn derive_record(event: RawTelemetryEvent) -> EnergyRecord {
    let RawTelemetryEvent {
        site_id,
        timestamp,
        energy_generated_kwh,
        energy_consumed_kwh,
    } = event;

    EnergyRecord {
        site_id,
        timestamp: timestamp.to_offset(UtcOffset::UTC),
        energy_generated_kwh,
        energy_consumed_kwh,
        net_energy_kwh: energy_generated_kwh - energy_consumed_kwh,
        anomaly: is_anomaly(energy_generated_kwh, energy_consumed_kwh),
    }
}

pub fn transform(payload: &[u8]) -> Result<EnergyRecord, PipelineError> {
    parse_event(payload).map(derive_record)
}

#[derive(Clone, Default)]
pub struct TelemetryTransform;

#[async_trait::async_trait]
impl Transform<Vec<u8>, EnergyRecord> for TelemetryTransform {
    async fn apply(&self, input: Envelope<Vec<u8>>) -> Result<Envelope<EnergyRecord>, PipelineError> {
        match transform(&input.payload) {
            Ok(record) => {
                if record.anomaly {
                    metrics::counter!("telemetry_anomalies_total").increment(1);
                }
                Ok(Envelope {
                    payload: record,
                    received_at: input.received_at,
                })
            }
            Err(e) => {
                metrics::counter!("telemetry_malformed_total").increment(1);
                Err(e)
            }
        }
    }
}

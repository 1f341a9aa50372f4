mod energy_record;
mod telemetry_event;

pub use energy_record::{EnergyRecord, EnergyRecordKey};
pub use telemetry_event::{blob_key, format_timestamp, RawTelemetryEvent};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::format_timestamp;

/// Natural key of a stored record. Writes with an equal key replace each other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnergyRecordKey {
    pub site_id: String,
    pub timestamp: OffsetDateTime,
}

/// A telemetry reading as persisted in the `energy_data` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnergyRecord {
    pub site_id: String,
    #[sqlx(rename = "ts")]
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub energy_generated_kwh: f64,
    pub energy_consumed_kwh: f64,
    pub net_energy_kwh: f64,
    pub anomaly: bool,
}

impl EnergyRecord {
    pub fn key(&self) -> EnergyRecordKey {
        EnergyRecordKey {
            site_id: self.site_id.clone(),
            timestamp: self.timestamp,
        }
    }

    pub fn timestamp_text(&self) -> String {
        format_timestamp(self.timestamp)
    }
}

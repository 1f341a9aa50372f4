use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime, UtcOffset};

/// One periodic energy reading for a site, as produced by the telemetry
/// generator and stored as a JSON blob.
///
/// A value of `-1` in either energy field is the generator's marker for a
/// bad or missing reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTelemetryEvent {
    pub site_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub energy_generated_kwh: f64,
    pub energy_consumed_kwh: f64,
}

impl RawTelemetryEvent {
    pub fn blob_key(&self) -> String {
        blob_key(&self.site_id, self.timestamp)
    }
}

/// Canonical textual form of a reading timestamp: UTC, second precision,
/// `Z` suffix (`2025-02-17T04:10:43Z`).
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    let utc = ts.to_offset(UtcOffset::UTC);
    utc.format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z"))
        .unwrap_or_else(|_| utc.to_string())
}

/// Object key under which a raw event is stored: `{site_id}/{timestamp}.json`
/// with `:` and `-` stripped from the timestamp.
pub fn blob_key(site_id: &str, ts: OffsetDateTime) -> String {
    let sanitized: String = format_timestamp(ts)
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .collect();
    format!("{site_id}/{sanitized}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn format_timestamp_normalizes_to_utc_seconds() {
        let ts = datetime!(2025-02-17 06:10:43.250 +02:00);
        assert_eq!(format_timestamp(ts), "2025-02-17T04:10:43Z");
    }

    #[test]
    fn format_timestamp_pads_components() {
        let ts = datetime!(2025-03-04 05:06:07 UTC);
        assert_eq!(format_timestamp(ts), "2025-03-04T05:06:07Z");
    }

    #[test]
    fn blob_key_strips_separators() {
        let ts = datetime!(2025-02-17 04:10:43 UTC);
        assert_eq!(blob_key("site1", ts), "site1/20250217T041043Z.json");
    }

    #[test]
    fn event_serializes_in_wire_shape() {
        let event = RawTelemetryEvent {
            site_id: "site1".to_string(),
            timestamp: datetime!(2025-02-17 04:10:43 UTC),
            energy_generated_kwh: 42.5,
            energy_consumed_kwh: -1.0,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["timestamp"], "2025-02-17T04:10:43Z");
        assert_eq!(json["energy_consumed_kwh"], -1.0);

        let back: RawTelemetryEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}

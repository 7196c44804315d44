//! The measurement entity and its wire format.
//!
//! Rows arrive from the backend as JSON objects:
//!
//! ```json
//! {
//!   "id": 42,
//!   "created_at": "2024-05-01T12:00:00.123+00:00",
//!   "device_id": "sensor-1",
//!   "sensor_data": { "distance_cm": 18.4, "alert": false }
//! }
//! ```
//!
//! Older tables use Spanish column names (`datos_sensor`, `distancia_cm`,
//! `alerta`); those are accepted as aliases on input.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One distance reading taken by a sensor.
///
/// Measurements are produced by the data source and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Source-assigned identifier, increasing with each row.
    pub id: i64,
    /// When the source recorded the row. Drives ordering and the time axis.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    /// The sensor that produced the reading.
    pub device_id: String,
    #[serde(rename = "sensor_data", alias = "datos_sensor")]
    pub sensor_reading: SensorReading,
}

/// The payload reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Measured distance in centimetres. Not validated or clamped.
    #[serde(alias = "distancia_cm")]
    pub distance_cm: f64,
    /// Alert flag raised by the device itself.
    #[serde(alias = "alerta")]
    pub alert: bool,
}

impl Measurement {
    /// Convenience constructor, mostly for tests and in-memory feeds.
    pub fn new(
        id: i64,
        created_at: DateTime<Utc>,
        device_id: impl Into<String>,
        distance_cm: f64,
        alert: bool,
    ) -> Self {
        Self {
            id,
            created_at,
            device_id: device_id.into(),
            sensor_reading: SensorReading { distance_cm, alert },
        }
    }

    /// Shorthand for `sensor_reading.distance_cm`.
    pub fn distance_cm(&self) -> f64 {
        self.sensor_reading.distance_cm
    }

    /// Decode a row from an arbitrary JSON value.
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

/// Parse RFC 3339 timestamps, falling back to naive timestamps taken as UTC.
///
/// `timestamp without time zone` columns serialize without an offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

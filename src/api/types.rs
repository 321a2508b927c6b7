//! Dashboard API payloads.

use chrono::{DateTime, NaiveDateTime, ParseResult};
use serde::{Deserialize, Deserializer, Serialize};

/// One environment sensor sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    pub id: i64,
    /// Air temperature in °C.
    pub temperature: f64,
    /// Relative air humidity in %.
    pub humidity: f64,
    /// Soil moisture in %.
    pub soil_humid: f64,
    /// Measured plant length in cm; 0 when no measurement was taken.
    pub grow: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: NaiveDateTime,
}

/// Accepts both naive ISO timestamps and RFC3339 with an offset.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Parse a server timestamp, keeping the wall-clock time as written.
///
/// A comma before the fraction (`09:00:00,123`) is accepted.
pub(super) fn parse_timestamp(raw: &str) -> ParseResult<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_local());
    }
    let raw = raw.replacen(',', ".", 1);
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
}

/// A registered control machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Device identifier used to address the machine's logs.
    pub device: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A charted environment quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentMetric {
    Temperature,
    Humidity,
    SoilHumidity,
    Growth,
}

impl EnvironmentMetric {
    #[must_use]
    pub fn value(self, record: &EnvironmentRecord) -> f64 {
        match self {
            Self::Temperature => record.temperature,
            Self::Humidity => record.humidity,
            Self::SoilHumidity => record.soil_humid,
            Self::Growth => record.grow,
        }
    }
}

/// One point of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub at: NaiveDateTime,
    pub value: f64,
}

/// Project records onto one metric, in input order.
///
/// Growth samples of zero mean "not measured" and are left out.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn series(records: &[EnvironmentRecord], metric: EnvironmentMetric) -> Vec<SeriesPoint> {
    records
        .iter()
        .filter(|r| metric != EnvironmentMetric::Growth || r.grow != 0.0)
        .map(|r| SeriesPoint {
            at: r.created_at,
            value: metric.value(r),
        })
        .collect()
}

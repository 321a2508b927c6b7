//! Machine operation history.
//!
//! Each control machine keeps a plain-text log, one run per line:
//!
//! ```text
//! 2023-06-04 09:00:00,120 - {"wtime1": 4, "wtime2": "2", "ctime": 1}
//! ```
//!
//! Runs are summed into per-day totals and projected onto a Sunday-first
//! week for charting.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::types::parse_timestamp;

/// Litres injected per logged operating unit.
pub const LITRES_PER_UNIT: f64 = 0.5;

/// One decoded run from a machine's operation log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationLogEntry {
    pub at: NaiveDateTime,
    /// Irrigation line 1 operating units.
    pub wtime1: f64,
    /// Irrigation line 2 operating units.
    pub wtime2: f64,
    /// Fertilizer operating units.
    pub ctime: f64,
}

#[derive(Deserialize)]
struct LoggedRun {
    #[serde(default, deserialize_with = "deserialize_units")]
    wtime1: f64,
    #[serde(default, deserialize_with = "deserialize_units")]
    wtime2: f64,
    #[serde(default, deserialize_with = "deserialize_units")]
    ctime: f64,
}

/// Units are logged either as JSON numbers or as numeric strings.
fn deserialize_units<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("unrepresentable number")),
        serde_json::Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        serde_json::Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!("expected a number, got {other}"))),
    }
}

impl OperationLogEntry {
    /// Decode one `<timestamp> - <json>` line.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        let (timestamp, payload) = line.split_once(" - ")?;
        let at = parse_timestamp(timestamp.trim()).ok()?;
        let run: LoggedRun = serde_json::from_str(payload).ok()?;
        Some(Self {
            at,
            wtime1: run.wtime1,
            wtime2: run.wtime2,
            ctime: run.ctime,
        })
    }
}

/// Decode a whole log body, skipping blank and undecodable lines.
#[must_use]
pub fn parse_operation_log(body: &str) -> Vec<OperationLogEntry> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let entry = OperationLogEntry::from_line(line);
            if entry.is_none() {
                debug!(name: "api.operation_log.skipped", line = %line, "Skipped log line");
            }
            entry
        })
        .collect()
}

/// Litres injected on one day, per line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OperationTotals {
    pub wtime1: f64,
    pub wtime2: f64,
    pub ctime: f64,
}

impl OperationTotals {
    fn add(&mut self, entry: &OperationLogEntry) {
        self.wtime1 += entry.wtime1 * LITRES_PER_UNIT;
        self.wtime2 += entry.wtime2 * LITRES_PER_UNIT;
        self.ctime += entry.ctime * LITRES_PER_UNIT;
    }
}

/// One column of the weekly chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyOperation {
    pub date: NaiveDate,
    pub totals: OperationTotals,
}

/// Operation totals bucketed by calendar day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationHistory {
    days: BTreeMap<NaiveDate, OperationTotals>,
}

impl OperationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add runs to their day's bucket.
    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = &'a OperationLogEntry>) {
        for entry in entries {
            self.days.entry(entry.at.date()).or_default().add(entry);
        }
    }

    /// Totals for `date`, zero when nothing ran.
    #[must_use]
    pub fn day(&self, date: NaiveDate) -> OperationTotals {
        self.days.get(&date).copied().unwrap_or_default()
    }

    /// The Sunday-to-Saturday week containing `date`, with empty days zero-filled.
    #[must_use]
    pub fn week(&self, date: NaiveDate) -> Vec<DailyOperation> {
        date.week(Weekday::Sun)
            .first_day()
            .iter_days()
            .take(7)
            .map(|date| DailyOperation {
                date,
                totals: self.day(date),
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl<'a> FromIterator<&'a OperationLogEntry> for OperationHistory {
    fn from_iter<T: IntoIterator<Item = &'a OperationLogEntry>>(iter: T) -> Self {
        let mut history = Self::new();
        history.extend(iter);
        history
    }
}

//! Data types passed between the fetch, collect and normalize stages.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Timestamp placeholder used when the upstream payload carries none.
pub const MISSING_TIMESTAMP: &str = "N/A";

/// An AQI value as reported upstream.
///
/// WAQI normally sends a number but uses text (usually `"-"`) for stations
/// that are offline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AqiValue {
    Number(f64),
    Text(String),
}

impl AqiValue {
    /// Numeric view of the value. Text is parsed after trimming; anything
    /// non-finite is rejected.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            AqiValue::Number(n) => *n,
            AqiValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }
}

/// One successful upstream reading, before any cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawReading {
    pub aqi: Option<AqiValue>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Station time as reported by the source, or [`MISSING_TIMESTAMP`].
    pub timestamp: String,
}

/// A reading tagged with the display name of the city it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityReading {
    pub city: String,
    pub reading: RawReading,
}

/// A city whose fetch failed. Never carries partial data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub city: String,
    pub message: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not fetch data for {}: {}", self.city, self.message)
    }
}

/// Result of one full pass over the configured cities.
///
/// Shared behind an `Arc` once produced and never mutated; a refresh builds
/// a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    pub readings: Vec<CityReading>,
    pub failures: Vec<FetchFailure>,
    pub fetched_at: DateTime<Utc>,
}

impl Batch {
    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self {
            readings: Vec::new(),
            failures: Vec::new(),
            fetched_at,
        }
    }
}

/// A normalized, classified row ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub city: String,
    pub aqi: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
    pub category: String,
    pub color: String,
}

/// Why a successfully fetched reading did not make it into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    MissingAqi,
    MissingCoordinates,
    NonNumericAqi,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscardReason::MissingAqi => "no AQI value",
            DiscardReason::MissingCoordinates => "no station coordinates",
            DiscardReason::NonNumericAqi => "AQI value is not numeric",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discard {
    pub city: String,
    pub reason: DiscardReason,
}

/// Output of normalization: rows in batch order plus the readings that were
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub rows: Vec<Row>,
    pub discarded: Vec<Discard>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows ordered worst air first. Ties keep batch order.
    pub fn sorted_by_aqi_desc(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.aqi.total_cmp(&a.aqi));
        rows
    }
}

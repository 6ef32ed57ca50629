//! Core data model: metric identifiers, timestamped samples, and
//! validated query windows.
//!
//! A [`Sample`] is one multi-metric sensor reading; it is immutable once
//! constructed and every stored value is guaranteed finite. A
//! [`TimeWindow`] is a validated query range with `start < end`
//! enforced at construction.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Identifier for one of the dashboard's sensor metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Rssi,
    Temperature,
    Humidity,
    Pressure,
    Rainfall,
    WaterLevel,
}

impl MetricId {
    /// Stable lowercase name, matching configuration keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::Rssi => "rssi",
            MetricId::Temperature => "temperature",
            MetricId::Humidity => "humidity",
            MetricId::Pressure => "pressure",
            MetricId::Rainfall => "rainfall",
            MetricId::WaterLevel => "water_level",
        }
    }

    /// All known metrics, in display order.
    pub fn all() -> &'static [MetricId] {
        &[
            MetricId::Rssi,
            MetricId::Temperature,
            MetricId::Humidity,
            MetricId::Pressure,
            MetricId::Rainfall,
            MetricId::WaterLevel,
        ]
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rssi" => Ok(MetricId::Rssi),
            "temperature" => Ok(MetricId::Temperature),
            "humidity" => Ok(MetricId::Humidity),
            "pressure" => Ok(MetricId::Pressure),
            "rainfall" => Ok(MetricId::Rainfall),
            "water_level" | "waterlevel" => Ok(MetricId::WaterLevel),
            other => Err(Error::InvalidArgument(format!("unknown metric: {}", other))),
        }
    }
}

/// One timestamped multi-metric reading.
///
/// Constructed by the range-query layer (from a fetched row) or by the
/// realtime stream (from a pushed event). Rows carrying NaN or infinite
/// values never become samples; construction rejects them.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    values: BTreeMap<MetricId, f64>,
}

impl Sample {
    /// Builds a sample, rejecting any non-finite value.
    pub fn new(timestamp: DateTime<Utc>, values: BTreeMap<MetricId, f64>) -> Result<Self> {
        for (metric, value) in &values {
            if !value.is_finite() {
                return Err(Error::DataIntegrity(format!(
                    "non-finite value {} for metric {}",
                    value, metric
                )));
            }
        }
        Ok(Self { timestamp, values })
    }

    /// Single-metric convenience constructor.
    pub fn point(timestamp: DateTime<Utc>, metric: MetricId, value: f64) -> Result<Self> {
        let mut values = BTreeMap::new();
        values.insert(metric, value);
        Self::new(timestamp, values)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Value for one metric, if this sample carries it.
    pub fn value(&self, metric: MetricId) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    pub fn values(&self) -> &BTreeMap<MetricId, f64> {
        &self.values
    }
}

/// A validated historical query range.
///
/// The invariant `start < end` holds for every constructed window, so
/// downstream code never re-checks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Builds a window, requiring `end > start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(Error::InvalidArgument(format!(
                "window end ({}) must be after start ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// The hour ending at `now`.
    pub fn last_hour(now: DateTime<Utc>) -> Self {
        Self { start: now - Duration::hours(1), end: now }
    }

    /// The 24 hours ending at `now`.
    pub fn last_day(now: DateTime<Utc>) -> Self {
        Self { start: now - Duration::days(1), end: now }
    }

    /// The 7 days ending at `now`.
    pub fn last_week(now: DateTime<Utc>) -> Self {
        Self { start: now - Duration::weeks(1), end: now }
    }

    /// The 4 weeks ending at `now` (the dashboard's "one month" preset).
    pub fn last_month(now: DateTime<Utc>) -> Self {
        Self { start: now - Duration::weeks(4), end: now }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

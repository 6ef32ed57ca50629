//! Reshaping samples for a rendering surface.
//!
//! The pipeline hands the renderer per-metric `{x, y}` series plus
//! preformatted axis labels; all drawing happens outside this crate.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::model::{MetricId, Sample};

/// One chart point: instant on the x axis, metric value on the y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub x: DateTime<Utc>,
    pub y: f64,
}

/// Time-ascending series of points for one metric.
pub type MetricSeries = Vec<ChartPoint>;

/// Splits samples into per-metric series, preserving input order.
///
/// A sample missing a value for a requested metric is dropped from that
/// metric's series only.
pub fn to_series(samples: &[Sample], metrics: &[MetricId]) -> BTreeMap<MetricId, MetricSeries> {
    let mut series: BTreeMap<MetricId, MetricSeries> = BTreeMap::new();
    for &metric in metrics {
        let points = samples
            .iter()
            .filter_map(|s| s.value(metric).map(|y| ChartPoint { x: s.timestamp(), y }))
            .collect();
        series.insert(metric, points);
    }
    series
}

/// Time-axis tick label shared by every rendering path.
///
/// Instants within the last 24 hours render as `HH:MM`; older ones as
/// `M/D HH:MM` (month and day unpadded). Output parity with the
/// dashboard requires exactly this rule.
pub fn axis_label(instant: DateTime<Utc>, reference_now: DateTime<Utc>) -> String {
    if reference_now - instant < Duration::hours(24) {
        instant.format("%H:%M").to_string()
    } else {
        instant.format("%-m/%-d %H:%M").to_string()
    }
}

/// Human axis label for one metric, matching the dashboard legends.
pub fn display_label(metric: MetricId) -> &'static str {
    match metric {
        MetricId::Rssi => "RSSI (dBm)",
        MetricId::Temperature => "Temperature (°C)",
        MetricId::Humidity => "Humidity (%)",
        MetricId::Pressure => "Pressure (hPa)",
        MetricId::Rainfall => "Rainfall (mm)",
        MetricId::WaterLevel => "Water level (m)",
    }
}

use chrono::{Duration, TimeZone, Utc};
use std::collections::BTreeMap;

use sensorstream_core::{axis_label, display_label, to_series, MetricId, Sample};

#[test]
fn to_series_splits_metrics_and_drops_missing_values() {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let mut both = BTreeMap::new();
    both.insert(MetricId::Temperature, 21.0);
    both.insert(MetricId::Humidity, 60.0);
    let mut temp_only = BTreeMap::new();
    temp_only.insert(MetricId::Temperature, 22.0);

    let samples = vec![
        Sample::new(base, both).unwrap(),
        Sample::new(base + Duration::minutes(1), temp_only).unwrap(),
    ];

    let series = to_series(&samples, &[MetricId::Temperature, MetricId::Humidity]);

    let temp = &series[&MetricId::Temperature];
    assert_eq!(temp.len(), 2);
    assert_eq!(temp[0].y, 21.0);
    assert_eq!(temp[1].y, 22.0);
    assert!(temp[0].x < temp[1].x);

    // The second sample carries no humidity; only that series shrinks.
    let humidity = &series[&MetricId::Humidity];
    assert_eq!(humidity.len(), 1);
    assert_eq!(humidity[0].y, 60.0);
}

#[test]
fn to_series_only_returns_requested_metrics() {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let samples = vec![Sample::point(base, MetricId::Pressure, 1013.2).unwrap()];

    let series = to_series(&samples, &[MetricId::Pressure]);
    assert_eq!(series.len(), 1);
    assert_eq!(series[&MetricId::Pressure][0].y, 1013.2);
}

#[test]
fn axis_label_uses_time_only_within_a_day() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    assert_eq!(axis_label(now - Duration::hours(2), now), "10:00");
    assert_eq!(axis_label(now - Duration::minutes(5), now), "11:55");
    // Exactly 24 hours old is no longer "recent".
    assert_eq!(axis_label(now - Duration::hours(24), now), "5/31 12:00");
}

#[test]
fn axis_label_prefixes_unpadded_date_when_older() {
    let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
    let old = Utc.with_ymd_and_hms(2024, 6, 3, 9, 5, 0).unwrap();
    assert_eq!(axis_label(old, now), "6/3 09:05");
}

#[test]
fn display_labels_carry_units() {
    assert_eq!(display_label(MetricId::Rssi), "RSSI (dBm)");
    assert_eq!(display_label(MetricId::Temperature), "Temperature (°C)");
    assert_eq!(display_label(MetricId::Humidity), "Humidity (%)");
    assert_eq!(display_label(MetricId::Pressure), "Pressure (hPa)");
    assert_eq!(display_label(MetricId::Rainfall), "Rainfall (mm)");
    assert_eq!(display_label(MetricId::WaterLevel), "Water level (m)");
}

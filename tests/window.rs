use chrono::{Duration, TimeZone, Utc};
use sensorstream_core::{MetricId, Sample, SlidingWindowBuffer};

fn sample_at(offset_secs: i64, value: f64) -> Sample {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Sample::point(base + Duration::seconds(offset_secs), MetricId::Temperature, value).unwrap()
}

#[test]
fn append_under_capacity_keeps_everything() {
    let mut buffer = SlidingWindowBuffer::new(5);
    for i in 0..3 {
        buffer.append(sample_at(i, i as f64));
    }
    assert_eq!(buffer.len(), 3);
    assert!(!buffer.is_empty());
    let snapshot = buffer.snapshot();
    assert_eq!(snapshot[0].value(MetricId::Temperature), Some(0.0));
    assert_eq!(snapshot[2].value(MetricId::Temperature), Some(2.0));
}

#[test]
fn eviction_keeps_last_capacity_samples_in_order() {
    let capacity = 20;
    let extra = 5;
    let mut buffer = SlidingWindowBuffer::new(capacity);
    for i in 0..(capacity + extra) {
        buffer.append(sample_at(i as i64, i as f64));
    }
    assert_eq!(buffer.len(), capacity);

    let snapshot = buffer.snapshot();
    for (idx, sample) in snapshot.iter().enumerate() {
        let expected = (extra + idx) as f64;
        assert_eq!(sample.value(MetricId::Temperature), Some(expected));
    }
    for pair in snapshot.windows(2) {
        assert!(pair[0].timestamp() <= pair[1].timestamp());
    }
}

#[test]
fn out_of_order_append_is_stored_as_is() {
    let mut buffer = SlidingWindowBuffer::new(5);
    buffer.append(sample_at(100, 1.0));
    buffer.append(sample_at(50, 2.0));
    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.len(), 2);
    // Append order wins; the buffer never re-sorts.
    assert_eq!(snapshot[0].value(MetricId::Temperature), Some(1.0));
    assert_eq!(snapshot[1].value(MetricId::Temperature), Some(2.0));
}

#[test]
fn clear_empties_the_buffer() {
    let mut buffer = SlidingWindowBuffer::new(3);
    buffer.append(sample_at(0, 1.0));
    buffer.clear();
    assert!(buffer.is_empty());
    assert_eq!(buffer.capacity(), 3);
}

#[test]
fn metric_values_skips_missing_metrics() {
    let mut buffer = SlidingWindowBuffer::new(3);
    buffer.append(sample_at(0, 21.5));
    buffer.append(sample_at(1, 22.0));
    assert_eq!(buffer.metric_values(MetricId::Temperature), vec![21.5, 22.0]);
    assert!(buffer.metric_values(MetricId::Humidity).is_empty());
}

mod common;

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

use common::{bad_value_row, mappings, temp_row, MockSource};
use sensorstream_core::source::FilterOp;
use sensorstream_core::{Error, MetricId, RangeQueryClient};

fn client(source: Arc<MockSource>) -> RangeQueryClient {
    RangeQueryClient::new(source, mappings(), 10_000)
}

#[tokio::test]
async fn invalid_window_short_circuits_without_network() {
    let source = MockSource::new();
    let client = client(source.clone());

    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let result = client.fetch(MetricId::Temperature, start, start, 100).await;

    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(source.query_calls(), 0);

    let result = client
        .fetch(MetricId::Temperature, start, start - Duration::hours(1), 100)
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(source.query_calls(), 0);
}

#[tokio::test]
async fn unmapped_metric_is_invalid_argument() {
    let source = MockSource::new();
    let client = client(source.clone());
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let result = client
        .fetch(MetricId::Rainfall, start, start + Duration::hours(1), 100)
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(source.query_calls(), 0);
}

#[tokio::test]
async fn builds_inclusive_ascending_capped_query() {
    let source = MockSource::new();
    let client = client(source.clone());
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let end = start + Duration::hours(1);

    client
        .fetch(MetricId::Temperature, start, end, 50_000)
        .await
        .unwrap();

    let requests = source.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.table, "env_readings");
    assert_eq!(request.select, vec!["created_at".to_string(), "temp".to_string()]);
    assert_eq!(request.filters.len(), 2);
    assert_eq!(request.filters[0].op, FilterOp::Gte);
    assert_eq!(request.filters[1].op, FilterOp::Lte);
    let order = request.order.as_ref().unwrap();
    assert_eq!(order.column, "created_at");
    assert!(!order.descending);
    // Caller asked for 50k rows; the hard cap wins.
    assert_eq!(request.limit, Some(10_000));
}

#[tokio::test]
async fn sanitization_drops_bad_rows_and_keeps_order() {
    let source = MockSource::new();
    source.queue_rows(vec![
        temp_row("2024-06-01T12:00:00+00:00", 21.0),
        bad_value_row("2024-06-01T12:01:00+00:00"),
        temp_row("not-a-timestamp", 22.0),
        temp_row("2024-06-01T12:02:00+00:00", 23.0),
    ]);
    let client = client(source.clone());
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let samples = client
        .fetch(MetricId::Temperature, start, start + Duration::hours(1), 100)
        .await
        .unwrap();

    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].value(MetricId::Temperature), Some(21.0));
    assert_eq!(samples[1].value(MetricId::Temperature), Some(23.0));
}

#[tokio::test]
async fn accepts_offsetless_timestamps_and_string_numbers() {
    let source = MockSource::new();
    let mut row = sensorstream_core::source::Row::new();
    row.insert(
        "created_at".to_string(),
        serde_json::Value::String("2024-06-01T12:00:00.250".to_string()),
    );
    row.insert("temp".to_string(), serde_json::Value::String("21.5".to_string()));
    source.queue_rows(vec![row]);
    let client = client(source.clone());
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    let samples = client
        .fetch(MetricId::Temperature, start, start + Duration::days(1), 100)
        .await
        .unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].value(MetricId::Temperature), Some(21.5));
}

#[tokio::test]
async fn transport_error_surfaces_status_and_body() {
    let source = MockSource::new();
    source.queue_error(Error::Transport { status: Some(500), message: "boom".into() });
    let client = client(source.clone());
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let result = client
        .fetch(MetricId::Temperature, start, start + Duration::hours(1), 100)
        .await;
    match result {
        Err(Error::Transport { status, message }) => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "boom");
        }
        other => panic!("expected transport error, got {:?}", other.map(|s| s.len())),
    }
}

#[tokio::test]
async fn fetch_latest_queries_descending_and_resorts_ascending() {
    let source = MockSource::new();
    // Server answers newest-first, as requested.
    source.queue_rows(vec![
        temp_row("2024-06-01T12:05:00+00:00", 25.0),
        temp_row("2024-06-01T12:04:00+00:00", 24.0),
        temp_row("2024-06-01T12:03:00+00:00", 23.0),
    ]);
    let client = client(source.clone());

    let samples = client.fetch_latest(MetricId::Temperature, 3).await.unwrap();

    let requests = source.requests();
    let order = requests[0].order.as_ref().unwrap();
    assert!(order.descending);
    assert_eq!(requests[0].limit, Some(3));

    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].value(MetricId::Temperature), Some(23.0));
    assert_eq!(samples[2].value(MetricId::Temperature), Some(25.0));
    for pair in samples.windows(2) {
        assert!(pair[0].timestamp() <= pair[1].timestamp());
    }
}

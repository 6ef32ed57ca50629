//! Validated historical range queries.
//!
//! [`RangeQueryClient`] turns a bounded time-range request into one
//! capped, ascending-ordered upstream query and sanitizes the returned
//! rows into typed [`Sample`]s. Validation runs before any network call; a failed
//! validation short-circuits with an error and no query is issued.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::MetricMapping;
use crate::error::{Error, Result};
use crate::model::{MetricId, Sample, TimeWindow};
use crate::source::{DataSource, Filter, FilterOp, Order, QueryRequest, Row};

/// Client for time-bounded historical queries against one upstream
/// endpoint.
pub struct RangeQueryClient {
    source: Arc<dyn DataSource>,
    mappings: HashMap<MetricId, MetricMapping>,
    hard_cap: usize,
}

impl RangeQueryClient {
    /// Builds a client over `source`. `hard_cap` bounds every query's
    /// row count regardless of the caller-supplied limit.
    pub fn new(
        source: Arc<dyn DataSource>,
        mappings: HashMap<MetricId, MetricMapping>,
        hard_cap: usize,
    ) -> Self {
        Self { source, mappings, hard_cap }
    }

    /// Fetches samples for `metric` between `start` and `end`
    /// (inclusive on both ends), ascending.
    ///
    /// The window endpoints are validated first; `start >= end` returns
    /// `InvalidArgument` without touching the transport. Transport
    /// failures surface the HTTP status and body; the caller sees no
    /// partial data either way.
    pub async fn fetch(
        &self,
        metric: MetricId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Sample>> {
        let window = TimeWindow::new(start, end)?;
        self.fetch_window(metric, window, limit).await
    }

    /// [`fetch`](Self::fetch) with an already-validated window.
    pub async fn fetch_window(
        &self,
        metric: MetricId,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<Sample>> {
        let mapping = self.mapping(metric)?;
        let request = QueryRequest {
            table: mapping.table.clone(),
            select: vec![mapping.time_column.clone(), mapping.value_column.clone()],
            filters: vec![
                Filter {
                    column: mapping.time_column.clone(),
                    op: FilterOp::Gte,
                    value: window.start().to_rfc3339(),
                },
                Filter {
                    column: mapping.time_column.clone(),
                    op: FilterOp::Lte,
                    value: window.end().to_rfc3339(),
                },
            ],
            order: Some(Order { column: mapping.time_column.clone(), descending: false }),
            limit: Some(limit.min(self.hard_cap)),
        };

        let rows = self.source.query(request).await?;
        Ok(sanitize_rows(metric, mapping, &rows))
    }

    /// Fetches the most recent `limit` samples, re-sorted ascending.
    ///
    /// Upstream is queried descending so the newest rows win the limit;
    /// the realtime stream uses this to seed its sliding window.
    pub async fn fetch_latest(&self, metric: MetricId, limit: usize) -> Result<Vec<Sample>> {
        let mapping = self.mapping(metric)?;
        let request = QueryRequest {
            table: mapping.table.clone(),
            select: vec![mapping.time_column.clone(), mapping.value_column.clone()],
            filters: Vec::new(),
            order: Some(Order { column: mapping.time_column.clone(), descending: true }),
            limit: Some(limit.min(self.hard_cap)),
        };

        let rows = self.source.query(request).await?;
        let mut samples = sanitize_rows(metric, mapping, &rows);
        samples.sort_by_key(|s| s.timestamp());
        Ok(samples)
    }

    /// Upstream mapping for a metric; unknown metrics are an invalid
    /// argument, not a transport error.
    pub fn mapping(&self, metric: MetricId) -> Result<&MetricMapping> {
        self.mappings.get(&metric).ok_or_else(|| {
            Error::InvalidArgument(format!("no upstream mapping for metric {}", metric))
        })
    }
}

/// Parses one upstream row into a sample.
///
/// Shared by the historical path and the realtime INSERT handler so both
/// apply identical sanitization.
pub fn parse_row(metric: MetricId, mapping: &MetricMapping, row: &Row) -> Result<Sample> {
    let timestamp = row
        .get(&mapping.time_column)
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            Error::DataIntegrity(format!("row missing timestamp column {}", mapping.time_column))
        })
        .and_then(parse_timestamp)?;

    let value = row
        .get(&mapping.value_column)
        .ok_or_else(|| {
            Error::DataIntegrity(format!("row missing value column {}", mapping.value_column))
        })
        .and_then(parse_value)?;

    Sample::point(timestamp, metric, value)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    // Timestamps without an offset are taken as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::DataIntegrity(format!("unparseable timestamp {:?}: {}", raw, e)))
}

fn parse_value(raw: &serde_json::Value) -> Result<f64> {
    let value = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(Error::DataIntegrity(format!("non-numeric value {:?}", raw))),
    }
}

fn sanitize_rows(metric: MetricId, mapping: &MetricMapping, rows: &[Row]) -> Vec<Sample> {
    let samples: Vec<Sample> = rows
        .iter()
        .filter_map(|row| match parse_row(metric, mapping, row) {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!(error = %e, ?row, "dropping unparseable row");
                None
            }
        })
        .collect();
    debug!(received = rows.len(), kept = samples.len(), %metric, "rows sanitized");
    samples
}

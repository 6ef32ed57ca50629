//! Shared test fixtures: a call-counting fake data source and row
//! builders for the weather table shape.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

use sensorstream_core::config::MetricMapping;
use sensorstream_core::source::{
    CancelHandle, ChangeEvent, ChangeEventKind, DataSource, QueryRequest, Row, Subscription,
};
use sensorstream_core::{Error, MetricId, Result};

/// In-memory fake transport with queued query responses, a pushable
/// change feed, and call counters for no-network assertions.
pub struct MockSource {
    requests: Mutex<Vec<QueryRequest>>,
    responses: Mutex<VecDeque<Result<Vec<Row>>>>,
    query_gate: Mutex<Option<Arc<Notify>>>,
    query_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    ping_calls: AtomicUsize,
    ping_fail: AtomicBool,
    fail_subscribe: AtomicBool,
    event_tx: Mutex<Option<mpsc::Sender<ChangeEvent>>>,
    cancelled: Arc<AtomicBool>,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            query_gate: Mutex::new(None),
            query_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            ping_calls: AtomicUsize::new(0),
            ping_fail: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            event_tx: Mutex::new(None),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Queues the rows returned by the next query call.
    pub fn queue_rows(&self, rows: Vec<Row>) {
        self.responses.lock().unwrap().push_back(Ok(rows));
    }

    /// Queues an error returned by the next query call.
    pub fn queue_error(&self, error: Error) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Holds every query call until the returned gate is notified. The
    /// call is counted before it parks, so callers can poll
    /// [`query_calls`](Self::query_calls) to observe it in flight.
    pub fn gate_queries(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.query_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_subscribe(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    pub fn allow_subscribe(&self) {
        self.fail_subscribe.store(false, Ordering::SeqCst);
    }

    pub fn set_ping_fail(&self, fail: bool) {
        self.ping_fail.store(fail, Ordering::SeqCst);
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn ping_calls(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Delivers a change event to the open subscription.
    pub async fn push_event(&self, kind: ChangeEventKind, row: Row) {
        let tx = self
            .event_tx
            .lock()
            .unwrap()
            .clone()
            .expect("no open subscription");
        tx.send(ChangeEvent { kind, row }).await.expect("event channel closed");
    }
}

#[async_trait]
impl DataSource for MockSource {
    async fn query(&self, request: QueryRequest) -> Result<Vec<Row>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.query_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn subscribe(&self, table: &str, _events: &[ChangeEventKind]) -> Result<Subscription> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(Error::Subscription(format!("subscribe refused for {}", table)));
        }
        let (tx, rx) = mpsc::channel(64);
        *self.event_tx.lock().unwrap() = Some(tx);
        let cancelled = Arc::clone(&self.cancelled);
        Ok(Subscription::new(
            rx,
            CancelHandle::new(move || {
                cancelled.store(true, Ordering::SeqCst);
                Ok(())
            }),
        ))
    }

    async fn ping(&self, _table: &str, _column: &str) -> Result<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        if self.ping_fail.load(Ordering::SeqCst) {
            return Err(Error::Transport { status: Some(503), message: "ping refused".into() });
        }
        Ok(())
    }
}

/// Mapping for the temperature metric on the weather table.
pub fn temp_mapping() -> MetricMapping {
    MetricMapping {
        source: "weather".to_string(),
        table: "env_readings".to_string(),
        time_column: "created_at".to_string(),
        value_column: "temp".to_string(),
    }
}

pub fn mappings() -> HashMap<MetricId, MetricMapping> {
    let mut m = HashMap::new();
    m.insert(MetricId::Temperature, temp_mapping());
    m
}

/// One weather-table row with an RFC 3339 timestamp and a numeric temp.
pub fn temp_row(timestamp: &str, temp: f64) -> Row {
    let mut row = Row::new();
    row.insert("created_at".to_string(), serde_json::Value::String(timestamp.to_string()));
    row.insert(
        "temp".to_string(),
        serde_json::Number::from_f64(temp).map(serde_json::Value::Number).unwrap(),
    );
    row
}

/// A row whose temp column is not numeric.
pub fn bad_value_row(timestamp: &str) -> Row {
    let mut row = Row::new();
    row.insert("created_at".to_string(), serde_json::Value::String(timestamp.to_string()));
    row.insert("temp".to_string(), serde_json::Value::String("offline".to_string()));
    row
}

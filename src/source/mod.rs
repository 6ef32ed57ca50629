//! Upstream data source abstraction.
//!
//! The pipeline consumes a remote tabular/streaming service through the
//! [`DataSource`] trait: a range/limit `query`, a change-feed
//! `subscribe`, and a one-row `ping` used by the keep-alive heartbeat.
//! The shipped implementation is [`rest::RestSource`] (PostgREST query
//! syntax over HTTP); tests inject channel-backed fakes.
//!
//! Vendor subscription handles differ in how they are cancelled
//! (`unsubscribe` vs `close`); the [`Subscription`] type normalizes that
//! to a single [`CancelHandle`] capability.

pub mod rest;

pub use rest::RestSource;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;

/// One upstream row, as returned by the tabular service.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Range filter operator on a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Gte,
    Lte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
        }
    }
}

/// One column filter, rendered as `column=op.value` upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

/// Sort order on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// A fully-described tabular query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub table: String,
    pub select: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

/// Change-feed event categories the upstream can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEventKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeEventKind::Insert => "INSERT",
            ChangeEventKind::Update => "UPDATE",
            ChangeEventKind::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// One pushed change event.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeEventKind,
    pub row: Row,
}

/// Single cancellation capability for an open subscription.
///
/// Cloneable so the owning stream can keep one copy while the event
/// reader task owns the receiving half.
#[derive(Clone)]
pub struct CancelHandle(Arc<dyn Fn() -> Result<()> + Send + Sync>);

impl CancelHandle {
    pub fn new<F>(cancel: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(cancel))
    }

    pub fn cancel(&self) -> Result<()> {
        (self.0)()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CancelHandle")
    }
}

/// An open change-feed subscription: a stream of events plus the
/// normalized cancellation capability.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
    cancel: CancelHandle,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<ChangeEvent>, cancel: CancelHandle) -> Self {
        Self { events, cancel }
    }

    /// Next delivered event; `None` once the feed closes.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Splits the subscription into its event stream and cancel capability.
    pub fn into_parts(self) -> (mpsc::Receiver<ChangeEvent>, CancelHandle) {
        (self.events, self.cancel)
    }
}

/// Abstraction over the upstream tabular/streaming data service.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Executes a tabular query, returning rows in server order.
    async fn query(&self, request: QueryRequest) -> Result<Vec<Row>>;

    /// Opens a change-feed subscription on `table` for the given event
    /// kinds.
    async fn subscribe(&self, table: &str, events: &[ChangeEventKind]) -> Result<Subscription>;

    /// Minimal liveness probe: a one-row select against `table`.
    async fn ping(&self, table: &str, column: &str) -> Result<()>;
}

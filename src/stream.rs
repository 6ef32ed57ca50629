//! Realtime streaming engine.
//!
//! [`RealtimeStreamManager`] owns the live-mode state machine: it seeds
//! a bounded sliding window from the most recent history, subscribes to
//! the upstream change feed, keeps the subscription alive with a
//! jittered heartbeat, and applies INSERT events to the window as they
//! arrive. The live window is an append-only tail: UPDATE and DELETE
//! events are observed and logged but never mutate stored samples.
//!
//! All state transitions for one manager are serialized behind a single
//! async mutex; `start`, event application, and `stop` never interleave.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{LiveConfig, MetricMapping};
use crate::error::Result;
use crate::heartbeat::{HeartbeatScheduler, PingFn};
use crate::model::{MetricId, Sample};
use crate::query::{self, RangeQueryClient};
use crate::source::{CancelHandle, ChangeEvent, ChangeEventKind, DataSource};
use crate::stats::{self, StatsSummary};
use crate::window::SlidingWindowBuffer;

/// Lifecycle of one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Disconnected,
    Connecting,
    Subscribed,
    Failed,
}

struct Inner {
    state: SubscriptionState,
    metric: Option<MetricId>,
    buffer: SlidingWindowBuffer,
    heartbeat: HeartbeatScheduler,
    cancel: Option<CancelHandle>,
    event_task: Option<JoinHandle<()>>,
    /// Bumped on every start/stop; in-flight work from an older
    /// generation discards its result instead of applying it.
    generation: u64,
}

/// Owner of one live metric stream: buffer, subscription handle, and
/// heartbeat. Create one per dashboard session; nothing here is global.
pub struct RealtimeStreamManager {
    source: Arc<dyn DataSource>,
    query: Arc<RangeQueryClient>,
    live: LiveConfig,
    inner: Arc<Mutex<Inner>>,
    revision: Arc<watch::Sender<u64>>,
}

impl RealtimeStreamManager {
    pub fn new(
        source: Arc<dyn DataSource>,
        query: Arc<RangeQueryClient>,
        live: LiveConfig,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        let inner = Inner {
            state: SubscriptionState::Disconnected,
            metric: None,
            buffer: SlidingWindowBuffer::new(live.window_capacity),
            heartbeat: HeartbeatScheduler::new(live.heartbeat_base(), live.heartbeat_jitter()),
            cancel: None,
            event_task: None,
            generation: 0,
        };
        Self {
            source,
            query,
            live,
            inner: Arc::new(Mutex::new(inner)),
            revision: Arc::new(revision),
        }
    }

    /// Starts live mode for `metric`.
    ///
    /// Only valid from `Disconnected`; calling while `Connecting` or
    /// `Subscribed` is a no-op. The window is seeded with the most
    /// recent `window_capacity` rows (fetched descending upstream,
    /// stored ascending); a seed failure is logged and the stream
    /// continues with an empty window. A subscribe failure leaves the
    /// manager in `Failed` and returns the error.
    pub async fn start(&self, metric: MetricId) -> Result<()> {
        let generation = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SubscriptionState::Connecting | SubscriptionState::Subscribed => {
                    debug!(%metric, "stream already active; ignoring start");
                    return Ok(());
                }
                SubscriptionState::Disconnected | SubscriptionState::Failed => {}
            }
            inner.state = SubscriptionState::Connecting;
            inner.metric = Some(metric);
            inner.buffer = SlidingWindowBuffer::new(self.live.window_capacity);
            inner.generation += 1;
            inner.generation
        };

        // Seed fetch runs outside the lock so a concurrent stop() can
        // win; its result is discarded when the generation moved on.
        let seed = self.query.fetch_latest(metric, self.live.window_capacity).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.state != SubscriptionState::Connecting {
            debug!(%metric, "stream stopped during seed fetch; discarding rows");
            return Ok(());
        }

        match seed {
            Ok(samples) => {
                for sample in samples {
                    inner.buffer.append(sample);
                }
                debug!(len = inner.buffer.len(), %metric, "window seeded");
            }
            Err(e) => warn!(error = %e, %metric, "seed fetch failed; starting with empty window"),
        }

        let mapping = self.query.mapping(metric)?.clone();
        let subscription = match self
            .source
            .subscribe(
                &mapping.table,
                &[ChangeEventKind::Insert, ChangeEventKind::Update, ChangeEventKind::Delete],
            )
            .await
        {
            Ok(subscription) => subscription,
            Err(e) => {
                inner.state = SubscriptionState::Failed;
                error!(error = %e, %metric, "realtime subscription failed");
                return Err(e);
            }
        };

        let (events, cancel) = subscription.into_parts();
        inner.cancel = Some(cancel);
        inner.event_task = Some(self.spawn_event_reader(events, metric, mapping.clone(), generation));
        inner.heartbeat.start(self.ping_fn(&mapping));
        inner.state = SubscriptionState::Subscribed;
        self.revision.send_modify(|r| *r += 1);
        info!(%metric, capacity = self.live.window_capacity, "realtime stream subscribed");
        Ok(())
    }

    /// Stops live mode: cancels the heartbeat, unsubscribes (teardown
    /// errors are logged, never propagated), clears the window, and
    /// returns to `Disconnected`. No-op when already disconnected.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == SubscriptionState::Disconnected {
            return;
        }
        inner.generation += 1;
        inner.heartbeat.stop();
        if let Some(task) = inner.event_task.take() {
            task.abort();
        }
        if let Some(cancel) = inner.cancel.take() {
            if let Err(e) = cancel.cancel() {
                warn!(error = %e, "unsubscribe failed during stop");
            }
        }
        inner.buffer.clear();
        inner.metric = None;
        inner.state = SubscriptionState::Disconnected;
        info!("realtime stream stopped");
    }

    pub async fn state(&self) -> SubscriptionState {
        self.inner.lock().await.state
    }

    /// Current window contents, oldest first.
    pub async fn snapshot(&self) -> Vec<Sample> {
        self.inner.lock().await.buffer.snapshot()
    }

    /// Population statistics over the active metric's window.
    pub async fn window_stats(&self) -> Option<(MetricId, StatsSummary)> {
        let inner = self.inner.lock().await;
        let metric = inner.metric?;
        let values = inner.buffer.metric_values(metric);
        Some((metric, stats::all_stats(&values, false)))
    }

    /// Revision counter bumped whenever the window changes; chart code
    /// watches this instead of polling.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn ping_fn(&self, mapping: &MetricMapping) -> PingFn {
        let source = Arc::clone(&self.source);
        let table = mapping.table.clone();
        let column = mapping.time_column.clone();
        Arc::new(move || {
            let source = Arc::clone(&source);
            let table = table.clone();
            let column = column.clone();
            Box::pin(async move { source.ping(&table, &column).await })
        })
    }

    fn spawn_event_reader(
        &self,
        mut events: tokio::sync::mpsc::Receiver<ChangeEvent>,
        metric: MetricId,
        mapping: MetricMapping,
        generation: u64,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let revision = Arc::clone(&self.revision);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event.kind {
                    ChangeEventKind::Insert => {
                        let sample = match query::parse_row(metric, &mapping, &event.row) {
                            Ok(sample) => sample,
                            Err(e) => {
                                warn!(error = %e, "dropping unparseable INSERT event");
                                continue;
                            }
                        };
                        {
                            let mut inner = inner.lock().await;
                            if inner.generation != generation
                                || inner.state != SubscriptionState::Subscribed
                            {
                                break;
                            }
                            inner.buffer.append(sample);
                            debug!(
                                len = inner.buffer.len(),
                                capacity = inner.buffer.capacity(),
                                "live sample appended"
                            );
                        }
                        revision.send_modify(|r| *r += 1);
                    }
                    // The window is an append-only tail; mutations
                    // upstream are observed, not materialized.
                    ChangeEventKind::Update => {
                        debug!(kind = %event.kind, "change event observed; window unchanged")
                    }
                    ChangeEventKind::Delete => {
                        debug!(kind = %event.kind, "change event observed; window unchanged")
                    }
                }
            }
            debug!("change feed closed");
        })
    }
}

impl Drop for RealtimeStreamManager {
    fn drop(&mut self) {
        // The event reader holds only weak couplings (Arc clones); abort
        // it so a dropped manager does not leave a task behind.
        if let Ok(mut inner) = self.inner.try_lock() {
            inner.heartbeat.stop();
            if let Some(task) = inner.event_task.take() {
                task.abort();
            }
            if let Some(cancel) = inner.cancel.take() {
                if let Err(e) = cancel.cancel() {
                    warn!(error = %e, "unsubscribe failed during drop");
                }
            }
        }
    }
}

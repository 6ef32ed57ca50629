//! Keep-alive heartbeat with jittered scheduling.
//!
//! Long-lived subscriptions idle out on some upstreams; the scheduler
//! keeps them warm with a periodic ping. The interval is drawn uniformly
//! from `[base, base + jitter)` on every tick so many concurrent
//! dashboard sessions never ping in lockstep.

use futures::future::BoxFuture;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;

/// Async ping callback invoked on every tick.
pub type PingFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Periodic liveness ping owned by one realtime stream.
///
/// `start` pings immediately, then repeats until `stop` or drop. Ping
/// failures are logged and never stop the loop; only an explicit stop
/// does.
#[derive(Debug)]
pub struct HeartbeatScheduler {
    base: Duration,
    jitter: Duration,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatScheduler {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter, task: None }
    }

    /// Starts the ping loop, replacing any previous one.
    pub fn start(&mut self, ping: PingFn) {
        self.stop();
        let base = self.base;
        let jitter = self.jitter;
        self.task = Some(tokio::spawn(async move {
            loop {
                if let Err(e) = ping().await {
                    warn!(error = %e, "heartbeat ping failed");
                }
                let delay = {
                    let mut rng = rand::thread_rng();
                    base + jitter.mul_f64(rng.gen::<f64>())
                };
                debug!(delay_ms = delay.as_millis() as u64, "next heartbeat scheduled");
                tokio::time::sleep(delay).await;
            }
        }));
    }

    /// Cancels the ping loop; idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

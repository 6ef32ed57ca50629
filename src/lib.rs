//! Core library for the environmental telemetry pipeline.
//!
//! This crate provides the data pipeline behind a sensor dashboard:
//! - Validated historical range queries over a remote tabular service
//! - A realtime stream with a bounded sliding window and keep-alive
//! - Descriptive/order statistics and empirical CDFs over sample sets
//! - Chart-oriented reshaping of samples for an external renderer

pub mod chart;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod model;
pub mod query;
pub mod source;
pub mod stats;
pub mod stream;
pub mod window;

// Re-export commonly used types
pub use chart::{axis_label, display_label, to_series, ChartPoint, MetricSeries};
pub use config::{LiveConfig, MetricMapping, PipelineConfig, QueryConfig};
pub use error::{Error, Result};
pub use heartbeat::HeartbeatScheduler;
pub use model::{MetricId, Sample, TimeWindow};
pub use query::RangeQueryClient;
pub use source::{DataSource, RestSource, Subscription};
pub use stats::{CdfPoint, CdfSummary, StatsSummary};
pub use stream::{RealtimeStreamManager, SubscriptionState};
pub use window::SlidingWindowBuffer;

//! Configuration management for the sensorstream pipeline.
//!
//! Configuration is assembled from multiple sources, later ones
//! overriding earlier ones:
//! 1. Default configuration (embedded in the binary)
//! 2. System-wide configuration file (`/etc/sensorstream/config.toml`)
//! 3. User-specified configuration file (`--config`)
//! 4. Environment variables (prefixed with `SENSORSTREAM_`)
//! 5. Command-line arguments
//!
//! Credentials belong in environment variables, e.g.
//! `SENSORSTREAM_SOURCES__SENSOR_NET__API_KEY` for the `sensor_net`
//! endpoint.

use clap::Parser;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;
use crate::model::MetricId;

/// Command-line arguments shared by every subcommand.
#[derive(Debug, Default, Parser)]
pub struct Args {
    /// Configuration file path
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Override the URL of a named source, as name=url
    #[clap(long = "source-url")]
    pub source_urls: Vec<String>,
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Named upstream endpoints
    pub sources: HashMap<String, EndpointConfig>,
    /// Per-metric upstream mapping overrides, keyed by metric name
    #[serde(default)]
    pub metrics: HashMap<String, MetricMapping>,
    /// Historical query settings
    #[serde(default)]
    pub query: QueryConfig,
    /// Live streaming settings
    #[serde(default)]
    pub live: LiveConfig,
}

/// One upstream endpoint: base URL plus API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

/// Where one metric lives upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricMapping {
    /// Name of the endpoint in `sources`
    pub source: String,
    pub table: String,
    pub time_column: String,
    pub value_column: String,
}

/// Historical query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Hard row cap applied to every range query
    #[serde(default = "default_hard_cap")]
    pub hard_cap: usize,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { hard_cap: default_hard_cap(), timeout_secs: default_timeout_secs() }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Live streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Sliding window capacity, also used as the seed-fetch limit
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    /// Base heartbeat interval in milliseconds
    #[serde(default = "default_heartbeat_base_ms")]
    pub heartbeat_base_ms: u64,
    /// Uniform random jitter added to the base interval, in milliseconds
    #[serde(default = "default_heartbeat_jitter_ms")]
    pub heartbeat_jitter_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            heartbeat_base_ms: default_heartbeat_base_ms(),
            heartbeat_jitter_ms: default_heartbeat_jitter_ms(),
        }
    }
}

impl LiveConfig {
    pub fn heartbeat_base(&self) -> Duration {
        Duration::from_millis(self.heartbeat_base_ms)
    }

    pub fn heartbeat_jitter(&self) -> Duration {
        Duration::from_millis(self.heartbeat_jitter_ms)
    }
}

fn default_hard_cap() -> usize {
    10_000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_window_capacity() -> usize {
    20
}

fn default_heartbeat_base_ms() -> u64 {
    55_000
}

fn default_heartbeat_jitter_ms() -> u64 {
    10_000
}

lazy_static! {
    /// Built-in metric locations. Rainfall and water level have no
    /// upstream mapping yet; querying them yields an invalid-argument
    /// error until one is configured.
    static ref DEFAULT_MAPPINGS: HashMap<MetricId, MetricMapping> = {
        let mut m = HashMap::new();
        m.insert(MetricId::Rssi, MetricMapping {
            source: "sensor_net".to_string(),
            table: "lora_packets".to_string(),
            time_column: "datetime".to_string(),
            value_column: "rx_rssi".to_string(),
        });
        for (metric, value_column) in [
            (MetricId::Temperature, "temp"),
            (MetricId::Humidity, "humi"),
            (MetricId::Pressure, "pressure"),
        ] {
            m.insert(metric, MetricMapping {
                source: "weather".to_string(),
                table: "env_readings".to_string(),
                time_column: "created_at".to_string(),
                value_column: value_column.to_string(),
            });
        }
        m
    };
}

impl PipelineConfig {
    /// Load configuration from all sources.
    pub fn load(args: &Args) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name("/etc/sensorstream/config").required(false));

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.clone()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SENSORSTREAM").separator("__"),
        );

        for pair in &args.source_urls {
            match pair.split_once('=') {
                Some((name, url)) => {
                    builder = builder.set_override(format!("sources.{}.url", name), url)?;
                }
                None => warn!(%pair, "ignoring malformed --source-url (expected name=url)"),
            }
        }

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Effective mapping for a metric: configuration override first,
    /// then the built-in default.
    pub fn mapping_for(&self, metric: MetricId) -> Option<MetricMapping> {
        self.metrics
            .get(metric.as_str())
            .cloned()
            .or_else(|| DEFAULT_MAPPINGS.get(&metric).cloned())
    }

    /// Effective mappings for every known metric.
    pub fn metric_mappings(&self) -> HashMap<MetricId, MetricMapping> {
        let mut mappings = DEFAULT_MAPPINGS.clone();
        for (name, mapping) in &self.metrics {
            match MetricId::from_str(name) {
                Ok(metric) => {
                    mappings.insert(metric, mapping.clone());
                }
                Err(_) => warn!(%name, "ignoring mapping for unknown metric"),
            }
        }
        mappings
    }

    /// Endpoint serving a given mapping.
    pub fn endpoint_for(&self, mapping: &MetricMapping) -> Result<&EndpointConfig> {
        self.sources.get(&mapping.source).ok_or_else(|| {
            crate::error::Error::Config(format!(
                "metric mapping references unknown source: {}",
                mapping.source
            ))
        })
    }
}

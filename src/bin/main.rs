//! Sensorstream binary.
//!
//! Command-line front end for the telemetry pipeline: historical window
//! statistics, empirical CDFs, and a live streaming mode that prints
//! window statistics as samples arrive.

use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sensorstream_core::{
    chart,
    config::{Args, PipelineConfig},
    stats, Error, MetricId, RangeQueryClient, RealtimeStreamManager, RestSource, StatsSummary,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    args: Args,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a historical window and print its statistics
    Query(RangeCommand),
    /// Fetch a historical window and print its empirical CDF summary
    Cdf(CdfCommand),
    /// Stream live samples, printing window statistics on each update
    Live(LiveCommand),
}

#[derive(ClapArgs)]
struct RangeCommand {
    /// Metric to analyze
    #[arg(long)]
    metric: String,

    /// Preset window ending now: hour, day, week, or month
    #[arg(long, conflicts_with_all = ["start", "end"])]
    last: Option<String>,

    /// Window start (RFC 3339)
    #[arg(long, requires = "end")]
    start: Option<DateTime<Utc>>,

    /// Window end (RFC 3339)
    #[arg(long, requires = "start")]
    end: Option<DateTime<Utc>>,

    /// Maximum rows to fetch
    #[arg(long, default_value_t = 10_000)]
    limit: usize,

    /// Use the sample (n - 1) variance divisor
    #[arg(long)]
    sample: bool,
}

#[derive(ClapArgs)]
struct CdfCommand {
    #[command(flatten)]
    range: RangeCommand,

    /// Maximum CDF points to print
    #[arg(long, default_value_t = 100)]
    max_points: usize,
}

#[derive(ClapArgs)]
struct LiveCommand {
    /// Metric to stream
    #[arg(long)]
    metric: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_directive = match cli.verbose {
        0 => "sensorstream=info,sensorstream_core=info",
        1 => "sensorstream=debug,sensorstream_core=debug",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_target(true)
        .init();

    let config = PipelineConfig::load(&cli.args)?;

    match cli.command {
        Commands::Query(cmd) => {
            let (metric, samples) = fetch_range(&config, &cmd).await?;
            let values: Vec<f64> = samples.iter().filter_map(|s| s.value(metric)).collect();
            let summary = stats::all_stats(&values, cmd.sample);
            print_window(&samples);
            print_stats(metric, &summary);
        }
        Commands::Cdf(cmd) => {
            let (metric, samples) = fetch_range(&config, &cmd.range).await?;
            let values: Vec<f64> = samples.iter().filter_map(|s| s.value(metric)).collect();
            let summary = stats::cdf_summary(&values);
            let curve = stats::downsample_cdf(&values, cmd.max_points);
            print_window(&samples);
            println!("{} empirical CDF ({} samples)", chart::display_label(metric), summary.count);
            println!(
                "  mean {:.3}  median {:.3}  std dev {:.4}  q1 {:.3}  q3 {:.3}  min {:.3}  max {:.3}",
                summary.mean, summary.median, summary.std_dev,
                summary.q1, summary.q3, summary.min, summary.max,
            );
            for point in curve {
                println!("  {:>12.4}  {:>6.3}", point.value, point.probability);
            }
        }
        Commands::Live(cmd) => {
            let metric = MetricId::from_str(&cmd.metric)?;
            let (source, client) = build_client(&config, metric)?;
            let manager =
                RealtimeStreamManager::new(source, Arc::new(client), config.live.clone());
            manager.start(metric).await?;
            info!(%metric, "live stream running; Ctrl-C to stop");

            let mut changes = manager.subscribe_changes();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if let Some((metric, summary)) = manager.window_stats().await {
                            print_stats(metric, &summary);
                        }
                    }
                }
            }
            manager.stop().await;
        }
    }

    Ok(())
}

fn build_client(
    config: &PipelineConfig,
    metric: MetricId,
) -> Result<(Arc<RestSource>, RangeQueryClient), Error> {
    let mapping = config
        .mapping_for(metric)
        .ok_or_else(|| Error::InvalidArgument(format!("no upstream mapping for {}", metric)))?;
    let endpoint = config.endpoint_for(&mapping)?;
    let source = Arc::new(RestSource::new(
        &endpoint.url,
        &endpoint.api_key,
        config.query.timeout(),
    )?);
    let client = RangeQueryClient::new(
        source.clone(),
        config.metric_mappings(),
        config.query.hard_cap,
    );
    Ok((source, client))
}

async fn fetch_range(
    config: &PipelineConfig,
    cmd: &RangeCommand,
) -> Result<(MetricId, Vec<sensorstream_core::Sample>), Error> {
    let metric = MetricId::from_str(&cmd.metric)?;
    let (_, client) = build_client(config, metric)?;

    let now = Utc::now();
    let (start, end) = match (&cmd.last, cmd.start, cmd.end) {
        (Some(preset), _, _) => {
            let window = match preset.as_str() {
                "hour" => sensorstream_core::TimeWindow::last_hour(now),
                "day" => sensorstream_core::TimeWindow::last_day(now),
                "week" => sensorstream_core::TimeWindow::last_week(now),
                "month" => sensorstream_core::TimeWindow::last_month(now),
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "unknown preset {:?} (expected hour, day, week, or month)",
                        other
                    )))
                }
            };
            (window.start(), window.end())
        }
        (None, Some(start), Some(end)) => (start, end),
        // No explicit range: the dashboard's default of the last hour.
        _ => {
            let window = sensorstream_core::TimeWindow::last_hour(now);
            (window.start(), window.end())
        }
    };

    let samples = client.fetch(metric, start, end, cmd.limit).await?;
    Ok((metric, samples))
}

fn print_window(samples: &[sensorstream_core::Sample]) {
    let now = Utc::now();
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => println!(
            "window: {} -> {} ({} samples)",
            chart::axis_label(first.timestamp(), now),
            chart::axis_label(last.timestamp(), now),
            samples.len(),
        ),
        _ => println!("window: no data"),
    }
}

fn print_stats(metric: MetricId, summary: &StatsSummary) {
    println!(
        "{}: count {}  mean {:.3}  variance {:.3}  std dev {:.4}  min {:.3}  max {:.3}  range {:.3}",
        chart::display_label(metric),
        summary.count,
        summary.mean,
        summary.variance,
        summary.std_dev,
        summary.min,
        summary.max,
        summary.range,
    );
}

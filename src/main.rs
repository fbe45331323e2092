//! CLI entry point for the subway arrivals tracker.
//!
//! Provides subcommands for a single refresh, a throttled polling loop, and
//! listing the station directory.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use subway_arrivals::config::{Config, FeedSet};
use subway_arrivals::output::{StopSummary, log_summaries, print_pretty, summarize, write_json};
use subway_arrivals::refresh::{DataSnapshot, RefreshController, RefreshSettings};
use subway_arrivals::stations::load_directory;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "subway-arrivals")]
#[command(about = "Upcoming NYC subway arrivals from the MTA realtime feeds", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Direction-suffixed stop id to watch (repeatable), e.g. 101N
    #[arg(short, long = "stop", value_name = "STOP_ID", global = true)]
    stops: Vec<String>,

    /// Which set of realtime endpoints to poll
    #[arg(long, value_enum, global = true)]
    feed_set: Option<FeedSet>,

    /// Minimum seconds between two network refreshes
    #[arg(long, global = true)]
    min_interval: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh once and print the arrivals as JSON
    Once,
    /// Poll repeatedly; the refresh throttle decides when the network is hit
    Watch {
        /// Seconds between polls
        #[arg(short, long, default_value_t = 5)]
        poll_secs: u64,

        /// Number of polls (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        iterations: usize,
    },
    /// Load and list the station directory
    Stations,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/subway_arrivals.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("subway_arrivals.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli.common)?;

    match cli.command {
        Commands::Once => {
            let controller = controller(&config)?;
            let snapshot = controller.request().await?;
            print_pretty(&snapshot);
            log_summaries(&summaries(&config, &snapshot));
            write_json(std::io::stdout().lock(), &snapshot.arrivals)?;
        }
        Commands::Watch {
            poll_secs,
            iterations,
        } => {
            watch(&config, poll_secs, iterations).await?;
        }
        Commands::Stations => {
            let client = config.plain_client()?;
            let directory = load_directory(&client, &config.stations_url).await?;

            for station in directory.values() {
                info!(
                    stop_id = %station.base_stop_id,
                    stop_name = %station.stop_name,
                    north = %station.north_direction_label,
                    south = %station.south_direction_label,
                    complex_id = %station.complex_id,
                    "Station"
                );
            }
            info!(total = directory.len(), "Station directory summary");
        }
    }

    Ok(())
}

/// Merges the config file, CLI flags and `MTA_API_KEY`.
fn build_config(args: &CommonArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    if !args.stops.is_empty() {
        config.watched_stops = args.stops.iter().cloned().collect();
    }
    if let Some(feed_set) = args.feed_set {
        config.feed_set = feed_set;
    }
    if let Some(secs) = args.min_interval {
        config.min_interval_secs = secs;
    }
    if let Ok(key) = std::env::var("MTA_API_KEY") {
        config.api_key = key;
    }

    config.validate()?;
    Ok(config)
}

fn controller(config: &Config) -> Result<RefreshController> {
    if config.api_key.is_empty() {
        warn!("MTA_API_KEY is not set; feed requests will likely be rejected");
    }
    if config.watched_stops.is_empty() {
        warn!("No stops watched; snapshots will carry no arrivals");
    }

    Ok(RefreshController::new(
        config.plain_client()?,
        config.feed_client()?,
        RefreshSettings::from(config),
    ))
}

fn summaries(config: &Config, snapshot: &DataSnapshot) -> Vec<StopSummary> {
    config
        .watched_stops
        .iter()
        .map(|stop_id| summarize(snapshot, stop_id))
        .collect()
}

/// Polls the controller every `poll_secs`. A failed refresh is logged and the
/// previous snapshot, if any, is shown instead.
#[tracing::instrument(skip(config))]
async fn watch(config: &Config, poll_secs: u64, iterations: usize) -> Result<()> {
    let controller = controller(config)?;

    if iterations == 0 {
        info!(poll_secs, "Polling infinitely. Press Ctrl+C to stop.");
    }

    let mut round = 0;
    loop {
        if iterations > 0 && round >= iterations {
            break;
        }
        round += 1;

        let snapshot = match controller.request().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!(error = %e, "Refresh failed");
                controller.snapshot()
            }
        };

        if let Some(snapshot) = snapshot {
            info!(round, generated_at = %snapshot.generated_at, "Snapshot");
            log_summaries(&summaries(config, &snapshot));
        }

        if iterations == 0 || round < iterations {
            tokio::time::sleep(Duration::from_secs(poll_secs)).await;
        }
    }

    if let Some(report) = controller.last_report() {
        info!(
            feed_success_pct = report.feed_success_pct(),
            arrivals = report.arrivals,
            "Last refresh"
        );
    }

    Ok(())
}

//! CLI entry point for aqi_watch.
//!
//! Fetches live AQI readings for the configured cities, classifies them and
//! renders the result as text, JSON or CSV. `watch` keeps running and serves
//! each round through the in-memory cache.

use anyhow::{Context, Result};
use aqi_watch::{
    collector::{BatchCache, Collector, DEFAULT_PACING, FetchStrategy, Progress},
    config::{ApiToken, Settings},
    error::ConfigError,
    fetch::{BasicClient, WaqiSource, auth::UrlParam},
    output::{Snapshot, append_rows, render_legend, render_text, write_json},
    services::reading_source::ReadingSource,
    watch::{self, WatchOptions},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "aqi_watch")]
#[command(about = "Live air-quality readings for a fixed set of cities", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every city once and print the table
    Snapshot {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// CSV file to append the table rows to
        #[arg(long)]
        csv: Option<String>,

        #[command(flatten)]
        strategy: StrategyArgs,
    },
    /// Fetch and classify a single station by its API identifier
    City {
        #[arg(value_name = "API_ID")]
        id: String,
    },
    /// Keep rendering snapshots; the cache decides when to refetch
    Watch {
        /// Seconds between renders
        #[arg(short, long, default_value_t = 60)]
        interval: u64,

        /// Number of renders (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value_t = 0)]
        rounds: usize,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        #[command(flatten)]
        strategy: StrategyArgs,
    },
    /// Print the AQI category legend
    Legend,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Args)]
struct StrategyArgs {
    /// Fetch cities concurrently instead of one by one
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Maximum number of in-flight requests with --parallel
    #[arg(short, long, default_value_t = 4)]
    concurrency: usize,

    /// Pause between sequential requests, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PACING.as_millis() as u64)]
    delay_ms: u64,
}

impl StrategyArgs {
    fn strategy(&self) -> FetchStrategy {
        if self.parallel {
            FetchStrategy::Parallel {
                max_concurrency: self.concurrency,
            }
        } else {
            FetchStrategy::Sequential {
                delay: Duration::from_millis(self.delay_ms),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/aqi_watch.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aqi_watch.log"));

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
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Snapshot {
            format,
            csv,
            strategy,
        } => {
            let collector = build_collector(&settings, strategy.strategy())?;
            let cache = BatchCache::new(settings.cache_ttl);

            let collection = collector.collect_all(&cache, log_progress).await;
            let snapshot = Snapshot::from_collection(&collection);
            emit(&snapshot, format)?;

            if let Some(path) = csv {
                append_rows(&path, &snapshot.table.rows)?;
                info!(path, rows = snapshot.table.len(), "CSV rows appended");
            }
        }
        Commands::City { id } => {
            let source = waqi_source(&settings, settings.require_token()?)?;

            let reading = source
                .fetch(&id)
                .await
                .with_context(|| format!("Fetch failed for {id}"))?;

            let category = aqi_watch::category::classify_value(reading.aqi.as_ref());
            info!(
                city_id = %id,
                aqi = ?reading.aqi,
                latitude = ?reading.latitude,
                longitude = ?reading.longitude,
                timestamp = %reading.timestamp,
                category = category.label(),
                color = category.color(),
                "Reading"
            );
            println!("{}", serde_json::to_string_pretty(&reading)?);
        }
        Commands::Watch {
            interval,
            rounds,
            format,
            strategy,
        } => {
            let collector = build_collector(&settings, strategy.strategy())?;
            let cache = BatchCache::new(settings.cache_ttl);
            let options = WatchOptions {
                interval: Duration::from_secs(interval),
                rounds,
            };

            if rounds == 0 {
                info!(interval, "Watching. Press Ctrl+C to stop.");
            }

            let rendered = watch::run(
                &collector,
                &cache,
                options,
                shutdown_signal(),
                log_progress,
                |c| emit(&Snapshot::from_collection(c), format),
            )
            .await?;
            info!(rendered, "Watch finished");
        }
        Commands::Legend => print!("{}", render_legend()),
    }

    Ok(())
}

/// Builds a collector backed by WAQI, or an unconfigured one when the token
/// is missing so the renderer can show the configuration message.
fn build_collector(settings: &Settings, strategy: FetchStrategy) -> Result<Collector> {
    let cities = settings.cities.clone();

    match settings.require_token() {
        Ok(token) => {
            let source: Arc<dyn ReadingSource> = Arc::new(waqi_source(settings, token)?);
            Ok(Collector::new(cities, source, strategy))
        }
        Err(e @ ConfigError::MissingToken { .. }) => {
            error!(error = %e, "Running without an API token");
            Ok(Collector::unconfigured(cities))
        }
        Err(e) => Err(e.into()),
    }
}

fn waqi_source(settings: &Settings, token: &ApiToken) -> Result<WaqiSource<UrlParam<BasicClient>>> {
    let source = match &settings.api_url {
        Some(url) => WaqiSource::with_base_url(token, url)?,
        None => WaqiSource::new(token)?,
    };
    Ok(source)
}

/// Resolves on Ctrl+C. If the handler cannot be installed the watch loop
/// only ends through `--rounds`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

fn log_progress(p: Progress<'_>) {
    info!(
        processed = p.processed,
        total = p.total,
        percent = (p.fraction() * 100.0).round() as u32,
        "{}",
        p.message()
    );
}

fn emit(snapshot: &Snapshot, format: Format) -> Result<()> {
    match format {
        Format::Text => print!("{}", render_text(snapshot)),
        Format::Json => write_json(std::io::stdout().lock(), snapshot)?,
    }
    Ok(())
}

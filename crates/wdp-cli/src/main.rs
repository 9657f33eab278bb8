//! WDP CLI - Main entry point
//!
//! Exposes the pipeline's stage entry points to the external scheduler.
//! A full `run` exits 0 when the run is done (status success or degraded)
//! and 1 on any fatal condition.

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::process;
use tracing::{error, info};
use wdp_common::channel::ResultChannel;
use wdp_common::logging::{init_logging, LogConfig, LogLevel};
use wdp_common::types::RunContext;
use wdp_pipeline::{
    EtlStage, PipelineConfig, PipelineRunner, RawIngestor, RawStore, Warehouse, WeatherClient,
};

#[derive(Parser, Debug)]
#[command(name = "wdp")]
#[command(author, version, about = "SkyLogix weather data pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a full pipeline run: ingest, transform/load, validate
    Run {
        /// Watermark of the previous run (RFC 3339); the extraction window
        /// starts at this instant minus the overlap buffer. Defaults to one
        /// hour ago.
        #[arg(long)]
        watermark: Option<DateTime<Utc>>,
    },

    /// Fetch current observations and upsert them into the raw store
    Ingest,

    /// Transform raw documents updated since the given instant and load
    /// them into the warehouse
    TransformLoad {
        /// Process raw documents updated at or after this instant
        /// (RFC 3339). Defaults to one hour ago.
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },

    /// Create tables and indexes in both stores
    InitSchema,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Environment configuration first, then the verbose flag on top
    let mut log_config = LogConfig::from_env().unwrap_or_else(|_| {
        LogConfig::builder()
            .log_file_prefix("wdp".to_string())
            .build()
    });
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }

    if let Err(e) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = execute(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = PipelineConfig::load()?;

    match cli.command {
        Command::Run { watermark } => {
            let previous_watermark = watermark.unwrap_or_else(default_watermark);
            let ctx = RunContext::new(previous_watermark);

            let channel = ResultChannel::new();
            let mut runner = PipelineRunner::connect(config, channel).await?;
            let outcome = runner.run(&ctx).await?;

            info!(
                run_id = %ctx.run_id,
                status = %outcome.status,
                ingested = outcome.ingestion.successful,
                loaded = outcome.etl.loaded,
                "Run finished"
            );
        }
        Command::Ingest => {
            let source = WeatherClient::new(config.source.clone())?;
            let store = RawStore::connect(&config.raw_store).await?;
            let ingestor = RawIngestor::new(source, store, config.cities.clone());

            ingestor.prepare().await?;
            let ctx = RunContext::new(Utc::now());
            let summary = ingestor.ingest_all(&ctx).await?;

            info!(
                successful = summary.successful,
                failed = summary.failed,
                total = summary.total,
                "Ingestion finished"
            );
        }
        Command::TransformLoad { since } => {
            let raw_store = RawStore::connect(&config.raw_store).await?;
            let warehouse = Warehouse::connect(&config.warehouse).await?;
            let stage = EtlStage::new(raw_store, warehouse);

            let since = since.unwrap_or_else(default_watermark);
            let summary = stage.run(since).await?;

            info!(
                fetched = summary.fetched,
                transformed = summary.transformed,
                loaded = summary.loaded,
                failed = summary.failed,
                "Transform/load finished"
            );
        }
        Command::InitSchema => {
            let raw_store = RawStore::connect(&config.raw_store).await?;
            let warehouse = Warehouse::connect(&config.warehouse).await?;

            raw_store.ensure_schema().await?;
            warehouse.ensure_schema().await?;

            info!("Schema initialized for both stores");
        }
    }

    Ok(())
}

/// Fallback watermark when the scheduler does not supply one
fn default_watermark() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

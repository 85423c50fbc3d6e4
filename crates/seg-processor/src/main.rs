//! Segmentation Processor - ingest a segmentation file into the store

use anyhow::{Context, Result};
use clap::Parser;
use seg_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use seg_processor::{MemoryStore, Processor, ProcessorConfig, SegmentationStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "seg-processor")]
#[command(author, version, about = "Segmentation file ingestion processor")]
struct Cli {
    /// Input file (overrides DATAFILEPATH)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Number of upsert workers (default: available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Dispatch queue capacity per worker
    #[arg(long)]
    queue_factor: Option<usize>,

    /// Seconds between progress lines
    #[arg(long)]
    progress_interval: Option<u64>,

    /// Upsert into an in-memory store instead of the database
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, mut config: ProcessorConfig) -> ProcessorConfig {
        if let Some(ref file) = self.file {
            config = config.with_data_file(file);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(factor) = self.queue_factor {
            config = config.with_queue_factor(factor);
        }
        if let Some(secs) = self.progress_interval {
            config = config.with_progress_interval(std::time::Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Both)
        .log_dir("./logs")
        .log_file_prefix("seg-processor")
        .filter_directives("sqlx=warn")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    let config = cli.apply(ProcessorConfig::from_env()?);
    config.validate()?;

    let store = build_store(cli.dry_run).await?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let processor = Processor::new(config, store);
    let summary = processor
        .run(cancel)
        .await
        .map_err(|e| {
            error!("processor_error={}", e);
            e
        })
        .context("ingestion aborted")?;

    if summary.is_complete() {
        info!("processor_finished_successfully");
    } else {
        warn!(
            "processor_cancelled enqueued={} processed={}",
            summary.counters.enqueued,
            summary.counters.consumed()
        );
    }

    Ok(())
}

async fn build_store(dry_run: bool) -> Result<Arc<dyn SegmentationStore>> {
    if dry_run {
        info!("Dry run: records go to an in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    connect_database().await
}

#[cfg(feature = "database")]
async fn connect_database() -> Result<Arc<dyn SegmentationStore>> {
    let db_config = seg_processor::DatabaseConfig::from_env()?;
    let store = seg_processor::PostgresStore::connect(&db_config)
        .await
        .context("db_init_error")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "database"))]
async fn connect_database() -> Result<Arc<dyn SegmentationStore>> {
    anyhow::bail!("built without the `database` feature; rerun with --dry-run")
}

/// Cancel the run on Ctrl+C or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, draining"),
        _ = terminate => info!("Received terminate signal, draining"),
        _ = cancel.cancelled() => return,
    }

    cancel.cancel();
}

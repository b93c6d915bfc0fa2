#![forbid(unsafe_code)]

//! `swarm-watch` session/process observability daemon binary.
//!
//! Bootstraps configuration, opens the record store, and runs the
//! background reconciliation tasks (orphan sweep, retention purge)
//! until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use swarm_watch::config::GlobalConfig;
use swarm_watch::persistence::{retention, ProcessStore, SqliteProcessStore};
use swarm_watch::supervisor::orphans;
use swarm_watch::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "swarm-watch", about = "Swarm session observability daemon", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the record store path from the config file.
    #[arg(long)]
    store: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("swarm-watch daemon bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(store_path) = args.store {
        config.store_path = store_path;
    }
    let config = Arc::new(config);
    info!("configuration loaded");

    let store: Arc<dyn ProcessStore> =
        Arc::new(SqliteProcessStore::connect(&config.store_path).await?);
    info!(store = %config.store_path.display(), "record store connected");

    let cancel = CancellationToken::new();
    let retention_handle =
        retention::spawn_retention_task(Arc::clone(&store), config.retention_days, cancel.clone());
    let sweep_handle =
        orphans::spawn_orphan_sweep(Arc::clone(&store), config.forwarder.clone(), cancel.clone());
    info!("background reconciliation tasks started");

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
    cancel.cancel();

    if let Err(err) = retention_handle.await {
        warn!(%err, "retention task join failed");
    }
    if let Err(err) = sweep_handle.await {
        warn!(%err, "orphan sweep join failed");
    }
    info!("swarm-watch daemon stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    let init_result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    init_result.map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))
}

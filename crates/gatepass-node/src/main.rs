//! Gatepass Node: entry point.
//!
//! Starts the credentialing node with configuration from a TOML file or defaults.

// Public APIs for node internals, used by tests and embedders.
#![allow(dead_code)]

mod api;
mod config;
mod node;
mod state;
mod storage;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{GatepassConfig, LogFormat, StorageBackend};
use node::GatepassNode;

/// Gatepass Node
#[derive(Parser, Debug)]
#[command(name = "gatepass-node", version, about = "Gatepass credentialing node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "gatepass.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Use the volatile in-memory record store.
    #[arg(long)]
    memory: bool,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        init_tracing(args.log_level.as_deref().unwrap_or("info"), LogFormat::Text);
        let config = GatepassConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = GatepassConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(ref data_dir) = args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if args.memory {
        config.storage.backend = StorageBackend::Memory;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }

    init_tracing(&config.logging.level, config.logging.format);
    tracing::info!("Gatepass Node v{}", env!("CARGO_PKG_VERSION"));

    let mut node = GatepassNode::new(config)?;
    let addr = node.start().await?;
    tracing::info!(%addr, "accepting requests");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server stopped");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    node.shutdown().await?;
    tracing::info!("Gatepass node exited cleanly");
    Ok(())
}

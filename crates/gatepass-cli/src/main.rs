//! Gatepass CLI: operator tooling for the credentialing node.
//!
//! Subcommands: init, status, issue, revoke, qr, scan, access-points.

mod client;
mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Gatepass: championship credentialing.
#[derive(Parser, Debug)]
#[command(name = "gatepass", version, about, long_about = None)]
struct Cli {
    /// Log HTTP traffic to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the operator profile (endpoint, actor, role).
    Init(commands::init::InitArgs),
    /// Query the status of a running node.
    Status(commands::status::StatusArgs),
    /// Issue a credential from an approved request.
    Issue(commands::issue::IssueArgs),
    /// Revoke or expire a credential.
    Revoke(commands::revoke::RevokeArgs),
    /// Show a fresh QR code for a credential.
    Qr(commands::qr::QrArgs),
    /// Submit a scanned QR payload at an access point.
    Scan(commands::scan::ScanArgs),
    /// List or create access points.
    AccessPoints(commands::access_points::AccessPointsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Status(args) => commands::status::run(args).await,
        Commands::Issue(args) => commands::issue::run(args).await,
        Commands::Revoke(args) => commands::revoke::run(args).await,
        Commands::Qr(args) => commands::qr::run(args).await,
        Commands::Scan(args) => commands::scan::run(args).await,
        Commands::AccessPoints(args) => commands::access_points::run(args).await,
    }
}

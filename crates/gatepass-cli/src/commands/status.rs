//! `gatepass status`: Query the status of a running node.

use clap::Args;
use serde::Deserialize;

use gatepass_core::ValidationPolicy;
use gatepass_credentials::MetricsSnapshot;

use crate::client::{ConnectionArgs, NodeClient};

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,
}

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    backend: String,
    uptime_secs: u64,
    metrics: MetricsSnapshot,
    validation: ValidationPolicy,
}

pub async fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let client = NodeClient::from_args(&args.conn)?;
    let status: StatusResponse = client.send_json(client.get("status")).await?;

    println!("Node Status:");
    println!("  Endpoint:   {}", client.endpoint());
    println!("  Version:    {}", status.version);
    println!("  Storage:    {}", status.backend);
    println!("  Uptime:     {}s", status.uptime_secs);
    println!(
        "  Freshness:  {}",
        if status.validation.enforce_freshness {
            format!("{}s", status.validation.freshness_window_secs)
        } else {
            "not enforced".to_string()
        }
    );
    println!("Scans:");
    println!("  Total:      {}", status.metrics.scans);
    println!("  Granted:    {}", status.metrics.granted);
    println!("  Denied:     {}", status.metrics.denied);
    println!("  Errors:     {}", status.metrics.infrastructure_errors);
    println!(
        "  Log writes: {} ({} failed)",
        status.metrics.log_writes, status.metrics.log_failures
    );
    Ok(())
}

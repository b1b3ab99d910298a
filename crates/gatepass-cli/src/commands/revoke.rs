//! `gatepass revoke`: Revoke or expire a credential.

use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use gatepass_core::Credential;

use crate::client::{ConnectionArgs, NodeClient};

#[derive(Args, Debug)]
pub struct RevokeArgs {
    /// Credential id.
    pub credential: Uuid,

    /// Reason recorded with the revocation.
    #[arg(long)]
    pub reason: Option<String>,

    /// Mark the credential expired instead of revoked.
    #[arg(long, conflicts_with = "reason")]
    pub expire: bool,

    #[command(flatten)]
    pub conn: ConnectionArgs,
}

#[derive(Serialize)]
struct RevokeRequest<'a> {
    reason: Option<&'a str>,
}

pub async fn run(args: &RevokeArgs) -> anyhow::Result<()> {
    let client = NodeClient::from_args(&args.conn)?;
    let credential: Credential = if args.expire {
        let path = format!("credentials/{}/expire", args.credential);
        client
            .send_json(client.post(&path, &serde_json::json!({})))
            .await?
    } else {
        let path = format!("credentials/{}/revoke", args.credential);
        let body = RevokeRequest {
            reason: args.reason.as_deref(),
        };
        client.send_json(client.post(&path, &body)).await?
    };

    println!(
        "Credential {} is now {}",
        credential.credential_number, credential.status
    );
    Ok(())
}

//! `gatepass issue`: Issue a credential from an approved request.

use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use gatepass_core::Credential;

use crate::client::{ConnectionArgs, NodeClient};

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Id of the approved credential request.
    #[arg(short, long)]
    pub request: Uuid,

    #[command(flatten)]
    pub conn: ConnectionArgs,
}

#[derive(Serialize)]
struct IssueRequest {
    request_id: Uuid,
}

pub fn print_credential(credential: &Credential) {
    let levels: Vec<&str> = credential.access_levels.iter().map(|l| l.as_str()).collect();
    println!("  ID:           {}", credential.id);
    println!("  Number:       {}", credential.credential_number);
    println!("  Holder:       {} ({})", credential.holder_name, credential.holder_title);
    println!("  Organization: {}", credential.organization_display());
    println!("  Access:       {}", levels.join(", "));
    println!(
        "  Valid:        {} to {}",
        credential.valid_from.format("%Y-%m-%d %H:%M UTC"),
        credential.valid_until.format("%Y-%m-%d %H:%M UTC")
    );
    println!("  Status:       {}", credential.status);
}

pub async fn run(args: &IssueArgs) -> anyhow::Result<()> {
    let client = NodeClient::from_args(&args.conn)?;
    let body = IssueRequest {
        request_id: args.request,
    };
    let credential: Credential = client
        .send_json(client.post("credentials/issue", &body))
        .await
        .map_err(|e| anyhow::anyhow!("issuance failed: {}", e))?;

    println!("Credential issued!");
    print_credential(&credential);
    Ok(())
}

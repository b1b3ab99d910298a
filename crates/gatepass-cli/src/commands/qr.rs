//! `gatepass qr`: Show a fresh QR code for a credential.

use anyhow::Context;
use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use uuid::Uuid;

use gatepass_credentials::{qr, QrPayload};

use crate::client::{ConnectionArgs, NodeClient};

#[derive(Args, Debug)]
pub struct QrArgs {
    /// Credential id.
    pub credential: Uuid,

    /// Write an SVG image to this path instead of printing to the terminal.
    #[arg(long)]
    pub svg: Option<PathBuf>,

    /// Print the raw payload JSON as well.
    #[arg(long)]
    pub raw: bool,

    #[command(flatten)]
    pub conn: ConnectionArgs,
}

#[derive(Deserialize)]
struct QrResponse {
    payload: QrPayload,
    encoded: String,
}

pub async fn run(args: &QrArgs) -> anyhow::Result<()> {
    let client = NodeClient::from_args(&args.conn)?;

    if let Some(ref path) = args.svg {
        let uri = format!("credentials/{}/qr?format=svg", args.credential);
        let svg = client.send(client.get(&uri)).await?.text().await?;
        std::fs::write(path, svg)
            .with_context(|| format!("could not write {}", path.display()))?;
        println!("QR code written to {}", path.display());
        return Ok(());
    }

    let uri = format!("credentials/{}/qr", args.credential);
    let resp: QrResponse = client.send_json(client.get(&uri)).await?;
    println!("{}", qr::render_terminal(&resp.payload)?);
    println!("  Credential: {}", resp.payload.credential_number);
    if let Some(generated) = resp.payload.generated_at() {
        println!("  Generated:  {}", generated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if args.raw {
        println!("  Payload:    {}", resp.encoded);
    }
    Ok(())
}

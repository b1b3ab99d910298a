//! `gatepass scan`: Submit a scanned QR payload at an access point.

use clap::Args;
use serde::{Deserialize, Serialize};
use std::io::Read;
use uuid::Uuid;

use gatepass_core::{AccessLevel, Coordinates, Credential, DenialReason};

use crate::client::{ConnectionArgs, NodeClient};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Access point id.
    #[arg(short, long)]
    pub access_point: Uuid,

    /// Scanned payload; `-` reads it from stdin.
    pub payload: String,

    /// Scanning device id.
    #[arg(long)]
    pub device: Option<String>,

    /// Device position as `lat,lon`.
    #[arg(long, value_parser = parse_coordinates)]
    pub at: Option<Coordinates>,

    #[command(flatten)]
    pub conn: ConnectionArgs,
}

#[derive(Serialize)]
struct ScanBody<'a> {
    payload: &'a str,
    access_point_id: Uuid,
    device_id: Option<&'a str>,
    coordinates: Option<Coordinates>,
}

#[derive(Deserialize)]
struct ScanDecision {
    granted: bool,
    #[serde(default)]
    reason: Option<DenialReason>,
    message: String,
    #[serde(default)]
    matched_level: Option<AccessLevel>,
    #[serde(default)]
    credential: Option<Credential>,
    log_recorded: bool,
}

pub fn parse_coordinates(s: &str) -> Result<Coordinates, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lon but got {:?}", s))?;
    let latitude: f64 = lat.trim().parse().map_err(|e| format!("latitude: {}", e))?;
    let longitude: f64 = lon.trim().parse().map_err(|e| format!("longitude: {}", e))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("coordinates out of range: {}", s));
    }
    Ok(Coordinates {
        latitude,
        longitude,
    })
}

pub async fn run(args: &ScanArgs) -> anyhow::Result<()> {
    let payload = if args.payload == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        args.payload.clone()
    };

    let client = NodeClient::from_args(&args.conn)?;
    let body = ScanBody {
        payload: payload.trim(),
        access_point_id: args.access_point,
        device_id: args.device.as_deref(),
        coordinates: args.at,
    };
    let decision: ScanDecision = client.send_json(client.post("scan", &body)).await?;

    if decision.granted {
        println!("GRANTED");
    } else {
        println!("DENIED");
    }
    println!("  {}", decision.message);
    if let Some(reason) = decision.reason {
        println!("  Reason:  {}", reason);
    }
    if let Some(level) = decision.matched_level {
        println!("  Level:   {}", level);
    }
    if let Some(ref credential) = decision.credential {
        println!(
            "  Holder:  {} ({}, {})",
            credential.holder_name,
            credential.holder_title,
            credential.organization_display()
        );
        println!("  Number:  {}", credential.credential_number);
    }
    if !decision.log_recorded {
        println!("  Warning: the access log entry could not be written");
    }
    Ok(())
}

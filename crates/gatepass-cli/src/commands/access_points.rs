//! `gatepass access-points`: List or create venue access points.

use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatepass_core::{AccessLevel, AccessPoint};

use crate::client::{ConnectionArgs, NodeClient};

#[derive(Args, Debug)]
pub struct AccessPointsArgs {
    #[command(subcommand)]
    pub command: AccessPointsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccessPointsCommand {
    /// List active access points.
    List {
        #[command(flatten)]
        conn: ConnectionArgs,
    },
    /// Create an access point (admin).
    Create(CreateArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Display name, e.g. "Press Box Elevator".
    #[arg(long)]
    pub name: String,

    /// Where the checkpoint is.
    #[arg(long, default_value = "")]
    pub location: String,

    /// Levels that admit a holder, comma-separated.
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub levels: Vec<AccessLevel>,

    /// Operating hours as `start-end` (24h, inclusive), e.g. `6-22`.
    #[arg(long, value_parser = parse_hours)]
    pub hours: Option<(u8, u8)>,

    /// Venue offset from UTC in minutes, for operating hours.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub utc_offset: i32,

    /// Restrict the access point to one event.
    #[arg(long)]
    pub event: Option<Uuid>,

    #[command(flatten)]
    pub conn: ConnectionArgs,
}

#[derive(Serialize)]
struct OperatingHoursBody {
    start_hour: u8,
    end_hour: u8,
    utc_offset_minutes: i32,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    name: &'a str,
    location: &'a str,
    required_access_levels: &'a [AccessLevel],
    operating_hours: Option<OperatingHoursBody>,
    event_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct AccessPointsResponse {
    access_points: Vec<AccessPoint>,
    count: usize,
}

pub fn parse_hours(s: &str) -> Result<(u8, u8), String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected start-end but got {:?}", s))?;
    let start: u8 = start.trim().parse().map_err(|e| format!("start hour: {}", e))?;
    let end: u8 = end.trim().parse().map_err(|e| format!("end hour: {}", e))?;
    if start > 23 || end > 23 {
        return Err("hours must be between 0 and 23".into());
    }
    Ok((start, end))
}

fn print_access_point(ap: &AccessPoint) {
    let levels: Vec<&str> = ap.required_access_levels.iter().map(|l| l.as_str()).collect();
    println!("  {}  {}", ap.id, ap.name);
    if !ap.location.is_empty() {
        println!("      Location: {}", ap.location);
    }
    println!("      Levels:   {}", levels.join(", "));
    if let Some(hours) = ap.operating_hours {
        println!(
            "      Hours:    {:02}:00-{:02}:59 (UTC{:+}m)",
            hours.start_hour, hours.end_hour, hours.utc_offset_minutes
        );
    }
}

pub async fn run(args: &AccessPointsArgs) -> anyhow::Result<()> {
    match &args.command {
        AccessPointsCommand::List { conn } => {
            let client = NodeClient::from_args(conn)?;
            let resp: AccessPointsResponse =
                client.send_json(client.get("access-points")).await?;
            println!("Active access points ({}):", resp.count);
            for ap in &resp.access_points {
                print_access_point(ap);
            }
        }
        AccessPointsCommand::Create(create) => {
            let client = NodeClient::from_args(&create.conn)?;
            let body = CreateBody {
                name: &create.name,
                location: &create.location,
                required_access_levels: &create.levels,
                operating_hours: create.hours.map(|(start_hour, end_hour)| OperatingHoursBody {
                    start_hour,
                    end_hour,
                    utc_offset_minutes: create.utc_offset,
                }),
                event_id: create.event,
            };
            let ap: AccessPoint = client.send_json(client.post("access-points", &body)).await?;
            println!("Access point created:");
            print_access_point(&ap);
        }
    }
    Ok(())
}

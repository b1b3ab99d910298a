//! `gatepass init`: Write the operator profile.

use clap::Args;
use std::path::PathBuf;

use gatepass_core::Role;

use crate::client::{Profile, DEFAULT_ENDPOINT, DEFAULT_PROFILE};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Acting user id sent with every request.
    #[arg(long)]
    pub actor: String,

    /// Acting role (admin, staff, scanner).
    #[arg(long, default_value = "scanner")]
    pub role: Role,

    /// Display name shown in node logs.
    #[arg(long)]
    pub name: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Where to write the profile.
    #[arg(long, default_value = DEFAULT_PROFILE)]
    pub profile: PathBuf,

    /// Overwrite an existing profile.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    if args.profile.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.profile.display()
        );
    }

    let profile = Profile {
        endpoint: args.endpoint.clone(),
        actor_id: args.actor.clone(),
        role: args.role,
        display_name: args.name.clone(),
    };
    profile.save(&args.profile)?;

    println!("Profile written to {}", args.profile.display());
    println!("  Endpoint: {}", profile.endpoint);
    println!("  Actor:    {} ({})", profile.actor_id, profile.role);
    Ok(())
}

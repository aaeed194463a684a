//! ibx-oph-rename - give a BloxOne on-prem host a new display name

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use ibx_bloxone::{rename_host, ActionOutcome, B1Client, HostSelector};
use ibx_common::config::{bloxone_config_path, load_bloxone_profile};
use ibx_common::logging;

/// Command-line arguments for ibx-oph-rename
#[derive(Parser, Debug)]
#[command(name = "ibx-oph-rename")]
#[command(about = "Rename a BloxOne on-prem host")]
#[command(version, disable_version_flag = true)]
struct Args {
    /// Current display name or IPv4 address of the host
    host: String,

    /// New display name
    newname: String,

    /// BloxOne configuration file (default: $BLOXONE_CONFIG_FILE, then ~/.bloxone.ini)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log each API call to stderr
    #[arg(short = 'V', long)]
    verbose: bool,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    debug!(
        "ibx-oph-rename v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: could not rename to {}: {:#}", args.host, args.newname, e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<bool> {
    let config_path = bloxone_config_path(args.config.as_deref())?;
    let profile = load_bloxone_profile(&config_path)?;
    let client = B1Client::new(&profile)?;

    let selector = HostSelector::parse(&args.host);
    match rename_host(&client, &selector, &args.newname).await? {
        ActionOutcome::Applied => {
            println!("{}: renamed to {}", args.host, args.newname);
            Ok(true)
        }
        _ => {
            eprintln!("{}: host not found, could not rename to {}", args.host, args.newname);
            Ok(false)
        }
    }
}

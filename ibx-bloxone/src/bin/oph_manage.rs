//! ibx-oph-manage - enable, disable, start or stop an application on a
//! BloxOne on-prem host

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use ibx_bloxone::{apply_action, ActionOutcome, AppType, B1Client, HostAction, HostSelector};
use ibx_common::config::{bloxone_config_path, load_bloxone_profile};
use ibx_common::logging;

/// Command-line arguments for ibx-oph-manage
#[derive(Parser, Debug)]
#[command(name = "ibx-oph-manage")]
#[command(about = "Enable, disable, start or stop a BloxOne on-prem host application")]
#[command(version, disable_version_flag = true)]
struct Args {
    /// enable, disable, start or stop
    action: HostAction,

    /// cdc, dfp, dhcp or dns
    app: AppType,

    /// On-prem host display name or IPv4 address
    host: String,

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
        "ibx-oph-manage v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: could not {} {}: {:#}", args.host, args.action, args.app, e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<bool> {
    let config_path = bloxone_config_path(args.config.as_deref())?;
    let profile = load_bloxone_profile(&config_path)?;
    let client = B1Client::new(&profile)?;

    let selector = HostSelector::parse(&args.host);
    let outcome = apply_action(&client, &selector, args.app, args.action).await?;

    match &outcome {
        ActionOutcome::Applied => println!("{}: {} {}", args.host, args.app, args.action.done()),
        ActionOutcome::Unchanged(reason) => println!("{}: {}", args.host, reason),
        ActionOutcome::Refused(reason) => {
            eprintln!("{}: {}, could not {} {}", args.host, reason, args.action, args.app)
        }
        ActionOutcome::HostNotFound => {
            eprintln!("{}: host not found, could not {} {}", args.host, args.action, args.app)
        }
    }
    Ok(outcome.succeeded())
}

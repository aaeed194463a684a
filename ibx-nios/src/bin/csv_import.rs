//! ibx-csv-import - import a CSV file of object definitions into a NIOS grid
//!
//! Credentials come from an INI profile file (see `ibx_common::config`).
//! Progress is printed every poll; when lines fail, the grid's error log
//! is saved to a temporary file and its path printed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use ibx_common::config::{grid_config_path, load_grid_profile};
use ibx_common::logging;
use ibx_nios::{run_import, ImportOptions, PollConfig, WapiSession};

/// Exit status when the import task outlived the polling budget
const EXIT_STILL_RUNNING: u8 = 2;

/// Command-line arguments for ibx-csv-import
#[derive(Parser, Debug)]
#[command(name = "ibx-csv-import")]
#[command(about = "Import a CSV file into an Infoblox grid")]
#[command(version, disable_version_flag = true)]
struct Args {
    /// Pathname of CSV import file
    csv_path: PathBuf,

    /// File with Infoblox credentials and WAPI info (default: $INFOBLOX_CONFIG_FILE, then ~/.infoblox)
    #[arg(long = "ib-config")]
    ib_config: Option<PathBuf>,

    /// Profile in Infoblox configuration file (default: first section)
    #[arg(long = "ib-profile")]
    ib_profile: Option<String>,

    /// Seconds between import status checks
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    /// Seconds to wait for the import to finish
    #[arg(long, default_value_t = 1800, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Log each WAPI call to stderr
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
        "ibx-csv-import v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config_path = grid_config_path(args.ib_config.as_deref())?;
    let profile = load_grid_profile(&config_path, args.ib_profile.as_deref())?;

    let session = WapiSession::authenticate(&profile).await?;

    let mut options = ImportOptions::new(&args.csv_path);
    options.poll = PollConfig {
        interval: Duration::from_secs(args.poll_interval),
        timeout: Duration::from_secs(args.timeout),
    };

    let report = run_import(&session, &options, |status| println!("{}", status))
        .await
        .with_context(|| format!("CSV import of {} failed", args.csv_path.display()))?;

    println!("{}", report.summary());
    if let Some(error_log) = &report.error_log {
        println!("See {} for CSV import errors", error_log.display());
    }

    if report.outcome.is_completed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_STILL_RUNNING))
    }
}

//! ibx-csv-export - export DNS A records to a CSV import file

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use ibx_common::config::{grid_config_path, load_grid_profile};
use ibx_common::logging;
use ibx_nios::export::{fetch_a_records, write_a_records, DEFAULT_MAX_RESULTS};
use ibx_nios::WapiSession;

/// Command-line arguments for ibx-csv-export
#[derive(Parser, Debug)]
#[command(name = "ibx-csv-export")]
#[command(about = "Export DNS A records in CSV import format")]
#[command(version, disable_version_flag = true)]
struct Args {
    /// Output CSV file
    #[arg(short, long, default_value = "export-a-records.csv")]
    output: PathBuf,

    /// File with Infoblox credentials and WAPI info (default: $INFOBLOX_CONFIG_FILE, then ~/.infoblox)
    #[arg(long = "ib-config")]
    ib_config: Option<PathBuf>,

    /// Profile in Infoblox configuration file (default: first section)
    #[arg(long = "ib-profile")]
    ib_profile: Option<String>,

    /// Fail if the grid holds more A records than this
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: u32,

    /// Log each WAPI call to stderr
    #[arg(short = 'V', long)]
    verbose: bool,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    debug!(
        "ibx-csv-export v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config_path = grid_config_path(args.ib_config.as_deref())?;
    let profile = load_grid_profile(&config_path, args.ib_profile.as_deref())?;
    let session = WapiSession::authenticate(&profile).await?;

    let records = fetch_a_records(&session, args.max_results).await?;

    let file = File::create(&args.output)
        .with_context(|| format!("Cannot create {}", args.output.display()))?;
    write_a_records(BufWriter::new(file), &records)
        .with_context(|| format!("Cannot write {}", args.output.display()))?;

    println!("Exported {} A records to {}", records.len(), args.output.display());
    Ok(())
}

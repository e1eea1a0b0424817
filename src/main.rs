use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// BNPL Microscope market-risk report
#[derive(Parser, Debug)]
#[clap(name = "bnpl-microscope", version)]
#[clap(about = "Fetch BNPL prices, compute risk analytics and print the dashboard report as JSON")]
struct Cli {
    /// JSON configuration file; defaults are used when omitted
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    bnpl_microscope::run(cli.config.as_deref())
        .await
        .context("bnpl-microscope failed")
}

//! docforge CLI — AI-assisted content refresh and relationship discovery.
//!
//! Drives content-update jobs (scrape → rewrite → review → apply) and
//! relationship-analysis jobs against a local docforge database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

//! docrouter CLI: classify and route business documents.
//!
//! Detects each document's format and intent, extracts or normalizes its
//! contents, and records a processing trace per thread.

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

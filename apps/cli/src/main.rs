//! Payscope CLI — salary estimation from free-text profiles.
//!
//! Extracts a structured profile, gathers web and internal benchmark
//! evidence concurrently, and synthesizes a salary estimate with a
//! confidence score.

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

//! Newsroom CLI.
//!
//! Plans and writes articles through the generation service, gates them with
//! the quality scorer, and keeps the knowledge base current from research
//! batches.

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

//! TenderPilot CLI — search Canadian government tender notices from the terminal.
//!
//! Downloads the public tender dataset, filters it, and asks a hosted LLM
//! for bid strategies and outreach emails.

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

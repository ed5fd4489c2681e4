use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod args;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_env("LOG").unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Plan => commands::plan::plan(&cli).await,
        Commands::Apply => commands::apply::apply(&cli).await,
        Commands::Destroy => commands::destroy::destroy(&cli).await,
        Commands::Inventory(args) => commands::inventory::inventory(args).await,
    }
}

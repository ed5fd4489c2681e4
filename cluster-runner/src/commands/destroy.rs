use anyhow::Result;
use common::config::parse_config;

use super::runtime;
use crate::args::Cli;

pub async fn destroy(cli: &Cli) -> Result<()> {
    let config = parse_config(&cli.file)?;
    runtime(&config.deploy)?.destroy(cli.verbose).await
}

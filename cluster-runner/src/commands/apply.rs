use std::path::Path;

use anyhow::Result;
use common::{command::done, config::parse_config};
use tokio::fs;
use tracing::info;

use super::{build_stack, runtime};
use crate::args::Cli;

pub const OUTPUTS_FILE: &str = "outputs.json";

pub async fn apply(cli: &Cli) -> Result<()> {
    let config = parse_config(&cli.file)?;
    // Fail on an unknown runtime before any token is issued
    let runtime = runtime(&config.deploy)?;
    let stack = build_stack(config).await?;

    let declaration = stack.declaration();
    info!(
        "applying {} virtual machines with {}",
        declaration.len(),
        runtime.name()
    );
    runtime.apply(&declaration, cli.verbose).await?;

    let outputs = Path::new(&stack.config.deploy.workdir).join(OUTPUTS_FILE);
    fs::write(
        &outputs,
        serde_json::to_string_pretty(&stack.cluster.outputs(&stack.env))?,
    )
    .await?;
    done(&format!("Outputs written to {}", outputs.display()));
    Ok(())
}

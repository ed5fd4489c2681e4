use anyhow::Result;
use common::config::parse_config;

use super::build_stack;
use crate::args::Cli;

pub async fn plan(cli: &Cli) -> Result<()> {
    let stack = build_stack(parse_config(&cli.file)?).await?;
    let declaration = stack.declaration();

    println!("{}", serde_json::to_string_pretty(&stack.cluster.outputs(&stack.env))?);
    println!();
    println!(
        "{:<28} {:<16} {:<18} {:<18} {:>4} {:>8}",
        "RESOURCE", "ADDRESS", "POOL", "DATASTORE", "CPUS", "MEMORY"
    );
    for node in stack.cluster.all_nodes() {
        println!(
            "{:<28} {:<16} {:<18} {:<18} {:>4} {:>8}",
            node.resource_name(),
            node.ip.ip_address.to_string(),
            node.pool.id,
            node.pool.datastore_id,
            node.cpus,
            node.memory
        );
    }
    println!();
    println!(
        "{} virtual machines would be handed to {}",
        declaration.len(),
        stack.config.deploy.runtime
    );
    Ok(())
}

use anyhow::{bail, Result};
use catalog::Catalog;
use common::{
    command::done,
    config::{Config, DeployConfig},
    credential::TokenRequest,
    exit,
    provider::{Declaration, Runtime},
};
use terraform::Terraform;
use topology::{cloud_init::FileTemplates, cluster, Cluster, ClusterProps, Environment};
use tracing::info;
use vault::Vault;

pub mod apply;
pub mod destroy;
pub mod inventory;
pub mod plan;

/// A fully resolved cluster and the environment it was resolved against
pub struct Stack {
    pub config: Config,
    pub env: Environment,
    pub cluster: Cluster,
}

impl Stack {
    pub fn declaration(&self) -> Declaration {
        let mut declaration = Declaration::new();
        self.cluster.declare(&self.env, &mut declaration);
        declaration
    }
}

pub fn token_request(deploy: &DeployConfig) -> TokenRequest {
    TokenRequest {
        policies: deploy.token_policies.clone(),
        lease: deploy.token_lease.clone(),
    }
}

/// Resolves the environment and builds every node. Nothing is deployed.
pub async fn build_stack(config: Config) -> Result<Stack> {
    let props = ClusterProps {
        nodes: config.cluster.nodes,
        masters: config.cluster.masters,
    };
    if let Err(err) = cluster::validate_counts(&props) {
        exit!(err, "Invalid cluster {}", config.cluster.name);
    }

    let catalog = Catalog::load(&config.deploy.catalog).await?;
    let env = match Environment::from_config(&config.env, &catalog).await {
        Ok(env) => env,
        Err(err) => exit!(err, "Could not resolve environment {}", config.env.name),
    };
    done(&format!("Environment {} resolved", env.name()));

    let vault = Vault::from_env(env.vault_address()).await?;
    let templates = FileTemplates::new(&config.deploy.templates);

    let cluster = match Cluster::create(
        &config.cluster.name,
        props,
        &env,
        &vault,
        &token_request(&config.deploy),
        &templates,
    )
    .await
    {
        Ok(cluster) => cluster,
        Err(err) => exit!(err, "Could not build cluster {}", config.cluster.name),
    };
    info!("{} nodes built", cluster.all_nodes().count());
    done(&format!("Cluster {} built", cluster.name()));

    Ok(Stack {
        config,
        env,
        cluster,
    })
}

pub fn runtimes(deploy: &DeployConfig) -> Vec<Box<dyn Runtime>> {
    vec![Box::new(Terraform::new(&deploy.workdir))]
}

pub fn runtime(deploy: &DeployConfig) -> Result<Box<dyn Runtime>> {
    for r in runtimes(deploy) {
        if r.name() == deploy.runtime {
            return Ok(r);
        }
    }
    bail!(format!("Unknown runtime {}", deploy.runtime));
}

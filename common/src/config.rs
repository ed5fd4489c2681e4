use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::exit;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub env: EnvConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    pub name: String,
    pub nodes: usize,
    pub masters: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvConfig {
    pub name: String,
    pub datacenter: String,
    pub domain: String,
    pub network: NetworkConfig,
    /// Name of the VM template every node is cloned from
    pub template: String,
    pub node: NodeConfigs,
    pub pools: Vec<PoolConfig>,
    pub vault_address: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    pub name: String,
    pub subnet: String,
    pub dns_servers: Vec<String>,
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfigs {
    pub master: NodeSettingsConfig,
    pub worker: NodeSettingsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeSettingsConfig {
    /// Format string such as `k8s-{env}-master{index}`
    pub name: String,
    pub network_offset: u32,
    pub cpus: u32,
    /// Memory in MB
    pub memory: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum PoolKind {
    Cluster,
    Host,
}

impl From<String> for PoolKind {
    fn from(s: String) -> Self {
        // Anything that is not a compute cluster is placed on a standalone host
        if s.eq_ignore_ascii_case("cluster") {
            PoolKind::Cluster
        } else {
            PoolKind::Host
        }
    }
}

impl From<PoolKind> for String {
    fn from(k: PoolKind) -> Self {
        match k {
            PoolKind::Cluster => "cluster".to_owned(),
            PoolKind::Host => "host".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    #[serde(rename = "type")]
    pub kind: PoolKind,
    pub name: String,
    pub datastore: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Orchestration runtime the declaration is handed to
    pub runtime: String,
    pub workdir: String,
    /// Resource catalog used to resolve datacenter objects
    pub catalog: String,
    /// Directory holding the cloud-init and inventory templates
    pub templates: String,
    pub token_policies: Vec<String>,
    pub token_lease: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            runtime: "terraform".to_owned(),
            workdir: "platform/terraform".to_owned(),
            catalog: "catalog.yml".to_owned(),
            templates: "files".to_owned(),
            token_policies: vec!["ssh-signer".to_owned()],
            token_lease: "60m".to_owned(),
        }
    }
}

fn is_yaml(file: &str) -> bool {
    matches!(
        Path::new(file).extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

pub fn parse_str(contents: &str, yaml: bool) -> Result<Config> {
    if yaml {
        Ok(serde_yaml::from_str(contents)?)
    } else {
        Ok(toml::from_str(contents)?)
    }
}

pub fn parse_config(file: &str) -> Result<Config> {
    let config = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(err) => exit!(err, "Could not read config file {}", file),
    };

    let config = match parse_str(&config, is_yaml(file)) {
        Ok(c) => c,
        Err(err) => exit!(err, "Could not parse config file {}", file),
    };

    info!("config file parsed");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STACK: &str = r#"
[cluster]
name = "dev"
nodes = 5
masters = 3

[env]
name = "dev"
datacenter = "dc1"
domain = "lab.local"
template = "ubuntu-2004"
vault_address = "https://vault.lab.local:8200"

[env.network]
name = "VM Network"
subnet = "192.168.10.0/24"
dns_servers = ["192.168.10.2"]
domains = ["lab.local"]

[env.node.master]
name = "kube-{env}-master{index}"
network_offset = 10
cpus = 2
memory = 4096

[env.node.worker]
name = "kube-{env}-worker{index}"
network_offset = 20
cpus = 4
memory = 8192

[[env.pools]]
type = "Cluster"
name = "compute"
datastore = "ds1"
weight = 2

[[env.pools]]
type = "host"
name = "esxi-1"
datastore = "ds2"
weight = 1
"#;

    #[test]
    fn parses_toml_stack() {
        let config = parse_str(STACK, false).expect("stack should parse");
        assert_eq!(config.cluster.nodes, 5);
        assert_eq!(config.cluster.masters, 3);
        assert_eq!(config.env.pools.len(), 2);
        assert_eq!(config.env.pools[0].kind, PoolKind::Cluster);
        assert_eq!(config.env.pools[1].kind, PoolKind::Host);
        assert_eq!(config.env.node.worker.network_offset, 20);
    }

    #[test]
    fn missing_deploy_section_uses_defaults() {
        let config = parse_str(STACK, false).expect("stack should parse");
        assert_eq!(config.deploy.runtime, "terraform");
        assert_eq!(config.deploy.token_policies, vec!["ssh-signer".to_owned()]);
        assert_eq!(config.deploy.token_lease, "60m");
    }

    #[test]
    fn unknown_pool_type_is_a_host() {
        assert_eq!(PoolKind::from("standalone".to_owned()), PoolKind::Host);
        assert_eq!(PoolKind::from("CLUSTER".to_owned()), PoolKind::Cluster);
    }

    #[test]
    fn parses_yaml_stack() {
        let toml_config = parse_str(STACK, false).expect("stack should parse");
        let yaml = serde_yaml::to_string(&toml_config).expect("config should serialize");
        let config = parse_str(&yaml, true).expect("yaml stack should parse");
        assert_eq!(config.env.network.subnet, "192.168.10.0/24");
        assert_eq!(config.env.pools[0].name, "compute");
    }

    #[test]
    fn yaml_detection_uses_extension() {
        assert!(is_yaml("Pulumi.dev.yaml"));
        assert!(is_yaml("stack.yml"));
        assert!(!is_yaml("stack.toml"));
    }

    #[test]
    fn shipped_stack_parses() {
        let config =
            parse_str(include_str!("../../stack.toml"), false).expect("stack.toml should parse");
        assert_eq!(config.deploy.catalog, "catalog.yml");
        assert_eq!(config.env.pools[0].weight, 2);
    }
}

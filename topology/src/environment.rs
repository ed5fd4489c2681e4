//! The deployment context shared by every node of a cluster
//!
//! An environment is resolved once per deployment from the stack configuration
//! and is read-only afterwards. Resource pools are ordered by descending weight
//! when the environment is built, so every cluster built from it sees the same
//! rotation.

use std::collections::BTreeSet;

use common::{
    config::EnvConfig,
    provider::{Datacenter, Image, InfraProvider},
};
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    ip::Ipv4Subnet,
    node_type::{ByNodeType, NodeType},
};

lazy_static::lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([^{}]*)\}").expect("placeholder pattern is valid");
}

const INDEX_PLACEHOLDER: &str = "index";
const ENV_PLACEHOLDER: &str = "env";

/// The IPv4 network nodes are attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    /// Platform id of the port group
    pub id: String,
    pub subnet: Ipv4Subnet,
    pub dns_servers: Vec<String>,
    pub domains: Vec<String>,
}

/// Sizing and naming for one node type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSettings {
    /// Format string with an `{index}` and optional `{env}` placeholder
    pub name: String,
    pub network_offset: u32,
    pub cpus: u32,
    /// Memory in MB
    pub memory: u64,
}

impl NodeSettings {
    fn validate(&self, node_type: NodeType) -> Result<()> {
        let invalid = |reason: String| Error::InvalidNameFormat {
            node_type: node_type.to_string(),
            format: self.name.clone(),
            reason,
        };

        let placeholders: BTreeSet<&str> = PLACEHOLDER
            .captures_iter(&self.name)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();
        if let Some(unknown) = placeholders
            .iter()
            .find(|p| **p != INDEX_PLACEHOLDER && **p != ENV_PLACEHOLDER)
        {
            return Err(invalid(format!("unknown placeholder {{{unknown}}}")));
        }
        if !placeholders.contains(INDEX_PLACEHOLDER) {
            return Err(invalid("missing {index} placeholder".to_owned()));
        }
        Ok(())
    }

    /// Node name for `index`: indices below 10 are zero padded to two digits.
    pub fn format_name(&self, index: u32, env_name: &str) -> String {
        let index = if index > 9 {
            index.to_string()
        } else {
            format!("0{index}")
        };
        PLACEHOLDER
            .replace_all(&self.name, |c: &Captures| match &c[1] {
                INDEX_PLACEHOLDER => index.clone(),
                _ => env_name.to_owned(),
            })
            .into_owned()
    }
}

/// A placement target for node virtual machines.
///
/// Pools with a higher weight come first in the round-robin rotation, so when
/// the node count does not divide evenly across pools they receive the extra
/// nodes. Weight orders the rotation; it does not scale the share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePool {
    pub id: String,
    pub datastore_id: String,
    pub weight: u32,
}

impl ResourcePool {
    pub fn new(id: impl Into<String>, datastore_id: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            datastore_id: datastore_id.into(),
            weight,
        }
    }
}

/// Everything needed to construct an [`Environment`]
#[derive(Debug, Clone)]
pub struct EnvironmentProps {
    pub name: String,
    pub datacenter: Datacenter,
    pub domain: String,
    pub pools: Vec<ResourcePool>,
    pub network: Network,
    pub image: Image,
    pub settings: ByNodeType<NodeSettings>,
    pub vault_address: String,
}

#[derive(Debug, Clone)]
pub struct Environment {
    name: String,
    datacenter: Datacenter,
    domain: String,
    pools: Vec<ResourcePool>,
    network: Network,
    image: Image,
    settings: ByNodeType<NodeSettings>,
    vault_address: String,
}

impl Environment {
    /// Validates the props and orders the pools by descending weight.
    ///
    /// The sort is stable: pools with equal weight keep their configured order.
    pub fn new(props: EnvironmentProps) -> Result<Self> {
        for pool in &props.pools {
            if pool.weight == 0 {
                return Err(Error::InvalidPoolWeight {
                    pool: pool.id.clone(),
                    weight: pool.weight,
                });
            }
        }
        for (node_type, settings) in props.settings.iter() {
            settings.validate(node_type)?;
        }

        let mut pools = props.pools;
        pools.sort_by(|a, b| b.weight.cmp(&a.weight));

        Ok(Self {
            name: props.name,
            datacenter: props.datacenter,
            domain: props.domain,
            pools,
            network: props.network,
            image: props.image,
            settings: props.settings,
            vault_address: props.vault_address,
        })
    }

    /// Resolves every platform object named in the configuration.
    pub async fn from_config(config: &EnvConfig, provider: &dyn InfraProvider) -> Result<Self> {
        info!("resolving environment {} with {}", config.name, provider.name());
        let dc = provider
            .resolve_datacenter(&config.datacenter)
            .await
            .map_err(|e| Error::resolve("datacenter", &config.datacenter, e))?;

        let mut pools = Vec::with_capacity(config.pools.len());
        for pool in &config.pools {
            let handle = provider
                .resolve_pool(&dc, pool.kind, &pool.name)
                .await
                .map_err(|e| Error::resolve("resource pool", &pool.name, e))?;
            let datastore = provider
                .resolve_datastore(&dc, &pool.datastore)
                .await
                .map_err(|e| Error::resolve("datastore", &pool.datastore, e))?;
            debug!(
                "pool {} -> {} on {} (weight {})",
                pool.name, handle.resource_pool_id, datastore.id, pool.weight
            );
            pools.push(ResourcePool::new(
                handle.resource_pool_id,
                datastore.id,
                pool.weight,
            ));
        }

        let network = provider
            .resolve_network(&dc, &config.network.name)
            .await
            .map_err(|e| Error::resolve("network", &config.network.name, e))?;
        let image = provider
            .resolve_image(&dc, &config.template)
            .await
            .map_err(|e| Error::resolve("template", &config.template, e))?;

        let settings = |c: &common::config::NodeSettingsConfig| NodeSettings {
            name: c.name.clone(),
            network_offset: c.network_offset,
            cpus: c.cpus,
            memory: c.memory,
        };

        Environment::new(EnvironmentProps {
            name: config.name.clone(),
            datacenter: dc,
            domain: config.domain.clone(),
            pools,
            network: Network {
                id: network.id,
                subnet: config.network.subnet.parse()?,
                dns_servers: config.network.dns_servers.clone(),
                domains: config.network.domains.clone(),
            },
            image,
            settings: ByNodeType::new(
                settings(&config.node.master),
                settings(&config.node.worker),
            ),
            vault_address: config.vault_address.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datacenter(&self) -> &Datacenter {
        &self.datacenter
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Resource pools, highest weight first
    pub fn pools(&self) -> &[ResourcePool] {
        &self.pools
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn settings(&self, node_type: NodeType) -> &NodeSettings {
        &self.settings[node_type]
    }

    pub fn vault_address(&self) -> &str {
        &self.vault_address
    }
}

//! Cluster construction
//!
//! A [`Cluster`] is resolved completely when it is created: the invariants are
//! checked, a single credential token is issued, masters and then workers are
//! scheduled across the environment's resource pools and every node spec is
//! built. Either every node is built or the whole build fails.

use common::{
    credential::{CredentialService, TokenRequest},
    provider::Declaration,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    cloud_init::TemplateRenderer,
    environment::Environment,
    error::{Error, Result},
    node::{self, NodeSpec},
    node_type::{ByNodeType, NodeType},
    scheduler::distribute,
};

/// Smallest viable cluster
pub const MINIMUM_NODES: usize = 3;

/// Requested shape of a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterProps {
    /// Total number of nodes, masters included
    pub nodes: usize,
    pub masters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterOutput {
    pub name: String,
    pub node_count: usize,
    pub masters: Vec<String>,
    pub workers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentOutput {
    pub name: String,
}

/// What downstream tooling reads after a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutputs {
    pub cluster: ClusterOutput,
    pub environment: EnvironmentOutput,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    name: String,
    node_count: usize,
    nodes: ByNodeType<Vec<NodeSpec>>,
    masters: Vec<String>,
    workers: Vec<String>,
}

/// Node and master counts, which need no environment to check
pub fn validate_counts(props: &ClusterProps) -> Result<()> {
    if props.nodes < MINIMUM_NODES {
        return Err(Error::InvalidNodeCount { nodes: props.nodes });
    }
    if props.masters == 0 {
        return Err(Error::InvalidMasterCount {
            masters: props.masters,
        });
    }
    Ok(())
}

/// Checks the cluster-level invariants before anything external is called.
pub fn validate(props: &ClusterProps, env: &Environment) -> Result<()> {
    validate_counts(props)?;
    if env.pools().is_empty() {
        return Err(Error::NoResourcePools);
    }
    Ok(())
}

impl Cluster {
    pub async fn create(
        name: impl Into<String>,
        props: ClusterProps,
        env: &Environment,
        credentials: &dyn CredentialService,
        token_request: &TokenRequest,
        renderer: &dyn TemplateRenderer,
    ) -> Result<Self> {
        let name = name.into();
        validate(&props, env)?;

        info!(
            "creating cluster {name}: {} nodes, {} masters across {} pools",
            props.nodes,
            props.masters,
            env.pools().len()
        );

        // One token for the whole cluster; every node embeds it in its userdata
        let token = credentials
            .issue_token(token_request)
            .await
            .map_err(|source| Error::Credential { source })?;

        let mut nodes: ByNodeType<Vec<NodeSpec>> = ByNodeType::default();
        nodes.master = build_nodes(NodeType::Master, props.masters, env, &token, renderer)?;

        // Derived from the masters actually built, not the masters requested
        let worker_count = props.nodes.saturating_sub(nodes.master.len());
        nodes.worker = build_nodes(NodeType::Worker, worker_count, env, &token, renderer)?;

        let fqdns = |node_type: NodeType| -> Vec<String> {
            nodes[node_type].iter().map(|n| n.fqdn(env.domain())).collect()
        };
        let masters = fqdns(NodeType::Master);
        let workers = fqdns(NodeType::Worker);

        info!(
            "cluster {name} resolved: {} masters, {} workers",
            masters.len(),
            workers.len()
        );
        Ok(Self {
            name,
            node_count: props.nodes,
            nodes,
            masters,
            workers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested node count
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn nodes(&self, node_type: NodeType) -> &[NodeSpec] {
        &self.nodes[node_type]
    }

    /// Masters first, each type in placement order
    pub fn all_nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.master.iter().chain(self.nodes.worker.iter())
    }

    pub fn masters(&self) -> &[String] {
        &self.masters
    }

    pub fn workers(&self) -> &[String] {
        &self.workers
    }

    pub fn outputs(&self, env: &Environment) -> StackOutputs {
        StackOutputs {
            cluster: ClusterOutput {
                name: self.name.clone(),
                node_count: self.node_count,
                masters: self.masters.clone(),
                workers: self.workers.clone(),
            },
            environment: EnvironmentOutput {
                name: env.name().to_owned(),
            },
        }
    }

    /// Declares one virtual machine per node
    pub fn declare(&self, env: &Environment, declaration: &mut Declaration) {
        for node in self.all_nodes() {
            declaration.declare_virtual_machine(node.resource_name(), node.to_virtual_machine(env));
        }
    }
}

fn build_nodes(
    node_type: NodeType,
    count: usize,
    env: &Environment,
    token: &str,
    renderer: &dyn TemplateRenderer,
) -> Result<Vec<NodeSpec>> {
    let subnet = env.network().subnet;
    distribute(node_type, count, env.pools())
        .into_iter()
        .map(|slot| {
            let spec = node::build(node_type, slot.index, slot.pool, env, token, renderer)?;
            if !subnet.contains(spec.ip.ip_address) {
                warn!(
                    "{} address {} is outside subnet {subnet}",
                    spec.name, spec.ip.ip_address
                );
            }
            Ok(spec)
        })
        .collect()
}

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{command::Stage, config::PoolKind};

pub const SETUP: Stage = Stage {
    ongoing: "Declaring cluster resources",
    failure: "Could not apply cluster resources",
    success: "Cluster resources applied",
};

pub const DESTROY: Stage = Stage {
    ongoing: "Tearing down cluster resources",
    failure: "Could not destroy cluster resources",
    success: "Destroyed cluster resources",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datacenter {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkHandle {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDisk {
    /// Size in GB as reported by the platform, may be fractional
    pub size: f64,
    #[serde(default)]
    pub thin_provisioned: bool,
    #[serde(default)]
    pub eagerly_scrub: bool,
}

/// The VM template nodes are cloned from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub guest_id: String,
    pub disks: Vec<ImageDisk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolHandle {
    pub resource_pool_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreHandle {
    pub id: String,
}

/// Lookups against the virtualization platform. Errors are surfaced verbatim.
#[async_trait::async_trait]
pub trait InfraProvider: Send + Sync {
    async fn resolve_datacenter(&self, name: &str) -> Result<Datacenter>;
    async fn resolve_network(&self, dc: &Datacenter, name: &str) -> Result<NetworkHandle>;
    async fn resolve_image(&self, dc: &Datacenter, name: &str) -> Result<Image>;
    async fn resolve_pool(&self, dc: &Datacenter, kind: PoolKind, name: &str)
        -> Result<PoolHandle>;
    async fn resolve_datastore(&self, dc: &Datacenter, name: &str) -> Result<DatastoreHandle>;
    fn name(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    pub label: String,
    pub size: u64,
    pub unit_number: u32,
    pub thin_provisioned: bool,
    pub eagerly_scrub: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneSource {
    pub template_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub network_id: String,
}

/// Desired state of a single virtual machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub name: String,
    pub resource_pool_id: String,
    pub datastore_id: String,
    pub num_cpus: u32,
    pub memory: u64,
    pub guest_id: String,
    pub disks: Vec<Disk>,
    pub clone: CloneSource,
    pub network_interfaces: Vec<NetworkInterface>,
    pub extra_config: BTreeMap<String, String>,
}

/// Set of resources handed to the orchestration runtime, keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Declaration {
    resources: BTreeMap<String, VirtualMachine>,
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the resource with the same name.
    pub fn declare_virtual_machine(
        &mut self,
        resource_name: impl Into<String>,
        vm: VirtualMachine,
    ) -> &VirtualMachine {
        let resource_name = resource_name.into();
        self.resources.insert(resource_name.clone(), vm);
        &self.resources[&resource_name]
    }

    pub fn get(&self, resource_name: &str) -> Option<&VirtualMachine> {
        self.resources.get(resource_name)
    }

    pub fn resources(&self) -> &BTreeMap<String, VirtualMachine> {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Diffs a declaration against the real platform and applies it.
#[async_trait::async_trait]
pub trait Runtime: Send + Sync {
    async fn apply(&self, declaration: &Declaration, verbose: bool) -> Result<()>;
    async fn destroy(&self, verbose: bool) -> Result<()>;
    fn name(&self) -> String;
}

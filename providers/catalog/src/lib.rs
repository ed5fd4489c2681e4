//! Infrastructure provider backed by a YAML resource catalog.
//!
//! The catalog mirrors what the virtualization platform exposes: datacenters,
//! and inside each one its networks, VM templates, compute clusters,
//! standalone hosts and datastores, each with the platform id a declaration
//! refers to.

use std::path::Path;

use anyhow::{anyhow, Result};
use common::{
    config::PoolKind,
    exit,
    provider::{
        Datacenter, DatastoreHandle, Image, ImageDisk, InfraProvider, NetworkHandle, PoolHandle,
    },
};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub datacenters: Vec<DatacenterEntry>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatacenterEntry {
    pub name: String,
    pub id: String,
    pub networks: Vec<Named>,
    pub templates: Vec<TemplateEntry>,
    pub clusters: Vec<PoolEntry>,
    pub hosts: Vec<PoolEntry>,
    pub datastores: Vec<Named>,
}

/// Any object that is looked up by name and referenced by id
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Named {
    pub name: String,
    pub id: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub name: String,
    pub id: String,
    pub guest_id: String,
    #[serde(default)]
    pub disks: Vec<ImageDisk>,
}

/// A compute cluster or host, through its root resource pool
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub name: String,
    pub resource_pool_id: String,
}

impl Catalog {
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => exit!(e, "Could not read catalog {}", path.display()),
        };
        match Self::parse(&contents) {
            Ok(catalog) => Ok(catalog),
            Err(e) => exit!(e, "Could not parse catalog {}", path.display()),
        }
    }

    fn datacenter(&self, dc: &Datacenter) -> Result<&DatacenterEntry> {
        self.datacenters
            .iter()
            .find(|d| d.id == dc.id)
            .ok_or_else(|| anyhow!("datacenter {} is not in the catalog", dc.name))
    }
}

fn find<'a, T>(
    items: &'a [T],
    name: &str,
    what: &str,
    dc: &Datacenter,
    key: impl Fn(&T) -> &str,
) -> Result<&'a T> {
    items
        .iter()
        .find(|item| key(item) == name)
        .ok_or_else(|| anyhow!("{what} {name} not found in datacenter {}", dc.name))
}

#[async_trait::async_trait]
impl InfraProvider for Catalog {
    async fn resolve_datacenter(&self, name: &str) -> Result<Datacenter> {
        let entry = self
            .datacenters
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| anyhow!("datacenter {name} not found"))?;
        debug!("datacenter {name} is {}", entry.id);
        Ok(Datacenter {
            id: entry.id.clone(),
            name: entry.name.clone(),
        })
    }

    async fn resolve_network(&self, dc: &Datacenter, name: &str) -> Result<NetworkHandle> {
        let entry = self.datacenter(dc)?;
        let network = find(&entry.networks, name, "network", dc, |n| n.name.as_str())?;
        Ok(NetworkHandle {
            id: network.id.clone(),
        })
    }

    async fn resolve_image(&self, dc: &Datacenter, name: &str) -> Result<Image> {
        let entry = self.datacenter(dc)?;
        let template = find(&entry.templates, name, "template", dc, |t| t.name.as_str())?;
        Ok(Image {
            id: template.id.clone(),
            guest_id: template.guest_id.clone(),
            disks: template.disks.clone(),
        })
    }

    async fn resolve_pool(&self, dc: &Datacenter, kind: PoolKind, name: &str) -> Result<PoolHandle> {
        let entry = self.datacenter(dc)?;
        let pool = match kind {
            PoolKind::Cluster => find(&entry.clusters, name, "compute cluster", dc, |p| p.name.as_str())?,
            PoolKind::Host => find(&entry.hosts, name, "host", dc, |p| p.name.as_str())?,
        };
        Ok(PoolHandle {
            resource_pool_id: pool.resource_pool_id.clone(),
        })
    }

    async fn resolve_datastore(&self, dc: &Datacenter, name: &str) -> Result<DatastoreHandle> {
        let entry = self.datacenter(dc)?;
        let datastore = find(&entry.datastores, name, "datastore", dc, |d| d.name.as_str())?;
        Ok(DatastoreHandle {
            id: datastore.id.clone(),
        })
    }

    fn name(&self) -> String {
        "catalog".to_owned()
    }
}

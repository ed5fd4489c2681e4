//! Node identity and virtual machine specification
//!
//! A node is one virtual machine acting as a kubernetes master or worker. Its
//! name, address, placement, disks and boot payloads are all derived from the
//! node type, its index within that type, the pool it was scheduled onto and
//! the environment. Nothing here talks to the platform; the resulting
//! [`NodeSpec`] is turned into a [`VirtualMachine`] declaration by the caller.

use std::collections::BTreeMap;

use common::provider::{CloneSource, Disk, Image, NetworkInterface, VirtualMachine};
use serde::Serialize;
use tracing::debug;

use crate::{
    cloud_init::{render_boot_payloads, BootPayloads, TemplateRenderer},
    environment::{Environment, ResourcePool},
    error::{Error, Result},
    ip::{allocate, IpConfig},
    node_type::NodeType,
};

/// Fully resolved description of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSpec {
    pub index: u32,
    pub node_type: NodeType,
    pub name: String,
    pub ip: IpConfig,
    #[serde(skip)]
    pub pool: ResourcePool,
    pub cpus: u32,
    pub memory: u64,
    pub disks: Vec<Disk>,
    #[serde(skip)]
    pub payloads: BootPayloads,
}

/// Copies the template's disks.
///
/// Sizes reported by the platform can be fractional; the declared size is the
/// integer part plus one so the clone is never smaller than its template.
pub fn derive_disks(image: &Image) -> Vec<Disk> {
    image
        .disks
        .iter()
        .zip(0u32..)
        .map(|(disk, i)| Disk {
            label: format!("disk{i}"),
            size: (disk.size.floor() as u64).saturating_add(1),
            unit_number: i,
            thin_provisioned: disk.thin_provisioned,
            eagerly_scrub: disk.eagerly_scrub,
        })
        .collect()
}

/// Builds the spec for the `index`th node of `node_type` placed in `pool`.
///
/// Fails if either boot payload cannot be rendered; no spec is produced then.
pub fn build(
    node_type: NodeType,
    index: u32,
    pool: &ResourcePool,
    env: &Environment,
    token: &str,
    renderer: &dyn TemplateRenderer,
) -> Result<NodeSpec> {
    let settings = env.settings(node_type);
    let name = settings.format_name(index, env.name());
    let ip = allocate(node_type, index, env);

    let prefix = env.network().subnet.prefix();
    let payloads = render_boot_payloads(renderer, &name, &ip, prefix, env.vault_address(), token)
        .map_err(|(template, source)| Error::Template {
            node: name.clone(),
            template: template.to_owned(),
            source,
        })?;

    debug!("built {node_type} {name} at {} in pool {}", ip.ip_address, pool.id);
    Ok(NodeSpec {
        index,
        node_type,
        name,
        ip,
        pool: pool.clone(),
        cpus: settings.cpus,
        memory: settings.memory,
        disks: derive_disks(env.image()),
        payloads,
    })
}

impl NodeSpec {
    /// Fully qualified host name within the environment's domain
    pub fn fqdn(&self, domain: &str) -> String {
        format!("{}.{}", self.name, domain)
    }

    /// Name of the declared virtual machine resource
    pub fn resource_name(&self) -> String {
        format!("vm-{}", self.name)
    }

    pub fn to_virtual_machine(&self, env: &Environment) -> VirtualMachine {
        let extra_config = BTreeMap::from([
            ("guestinfo.metadata".to_owned(), self.payloads.metadata.clone()),
            ("guestinfo.metadata.encoding".to_owned(), "base64".to_owned()),
            ("guestinfo.userdata".to_owned(), self.payloads.userdata.clone()),
            ("guestinfo.userdata.encoding".to_owned(), "base64".to_owned()),
        ]);

        VirtualMachine {
            name: self.name.clone(),
            resource_pool_id: self.pool.id.clone(),
            datastore_id: self.pool.datastore_id.clone(),
            num_cpus: self.cpus,
            memory: self.memory,
            guest_id: env.image().guest_id.clone(),
            disks: self.disks.clone(),
            clone: CloneSource {
                template_uuid: env.image().id.clone(),
            },
            network_interfaces: vec![NetworkInterface {
                network_id: env.network().id.clone(),
            }],
            extra_config,
        }
    }
}

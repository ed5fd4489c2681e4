//! Ansible inventory generated from a cluster's outputs

use minijinja::Value;
use serde::Serialize;

use crate::{
    cloud_init::{TemplateRenderer, INVENTORY_TEMPLATE},
    cluster::{ClusterOutput, MINIMUM_NODES},
    error::TemplateError,
};

/// Host groups handed to the inventory template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub all: Vec<String>,
    pub masters: Vec<String>,
    pub workers: Vec<String>,
    pub etcd_nodes: Vec<String>,
}

impl Inventory {
    /// etcd runs on the first three nodes, masters first. A minimum size
    /// cluster runs it on every node.
    pub fn from_output(output: &ClusterOutput) -> Self {
        let all: Vec<String> = output
            .masters
            .iter()
            .chain(output.workers.iter())
            .cloned()
            .collect();
        let etcd_nodes = all.iter().take(MINIMUM_NODES).cloned().collect();

        Self {
            all,
            masters: output.masters.clone(),
            workers: output.workers.clone(),
            etcd_nodes,
        }
    }

    pub fn render(&self, renderer: &dyn TemplateRenderer) -> Result<String, TemplateError> {
        renderer.render(INVENTORY_TEMPLATE, Value::from_serialize(self))
    }
}

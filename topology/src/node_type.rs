use std::{
    fmt,
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

/// Role a node plays in the kubernetes cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Master,
    Worker,
}

impl NodeType {
    /// Masters are always created before workers
    pub const ALL: [NodeType; 2] = [NodeType::Master, NodeType::Worker];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Master => "master",
            NodeType::Worker => "worker",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per node type, looked up by indexing with a [`NodeType`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByNodeType<T> {
    pub master: T,
    pub worker: T,
}

impl<T> ByNodeType<T> {
    pub fn new(master: T, worker: T) -> Self {
        Self { master, worker }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeType, &T)> {
        [(NodeType::Master, &self.master), (NodeType::Worker, &self.worker)].into_iter()
    }
}

impl<T> Index<NodeType> for ByNodeType<T> {
    type Output = T;

    fn index(&self, node_type: NodeType) -> &T {
        match node_type {
            NodeType::Master => &self.master,
            NodeType::Worker => &self.worker,
        }
    }
}

impl<T> IndexMut<NodeType> for ByNodeType<T> {
    fn index_mut(&mut self, node_type: NodeType) -> &mut T {
        match node_type {
            NodeType::Master => &mut self.master,
            NodeType::Worker => &mut self.worker,
        }
    }
}

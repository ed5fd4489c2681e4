//! Cluster topology and placement engine
//!
//! Derives, from a requested node count, a master/worker split and a weighted
//! set of resource pools, the name, address, placement and boot payloads of
//! every node of a kubernetes cluster.

pub mod cloud_init;
pub mod cluster;
pub mod environment;
pub mod error;
pub mod inventory;
pub mod ip;
pub mod node;
pub mod node_type;
pub mod scheduler;

pub use cluster::{Cluster, ClusterProps, StackOutputs};
pub use environment::{Environment, ResourcePool};
pub use error::{Error, Result, TemplateError};
pub use node::NodeSpec;
pub use node_type::{ByNodeType, NodeType};

//! Round-robin placement of nodes onto resource pools

use tracing::debug;

use crate::{environment::ResourcePool, node_type::NodeType};

/// One node position and the pool it is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<'a> {
    /// 1-based index within the node type
    pub index: u32,
    pub pool: &'a ResourcePool,
}

/// Places `count` nodes by cycling through `pools` in order.
///
/// `pools` is expected to be sorted by descending weight already, which is how
/// [`Environment::pools`](crate::environment::Environment::pools) hands them
/// out. Every call starts a fresh rotation at the first pool.
pub fn distribute<'a>(node_type: NodeType, count: usize, pools: &'a [ResourcePool]) -> Vec<Slot<'a>> {
    debug_assert!(
        count == 0 || !pools.is_empty(),
        "cannot place {count} {node_type} nodes without resource pools"
    );

    pools
        .iter()
        .cycle()
        .take(count)
        .zip(1u32..)
        .map(|(pool, index)| {
            debug!("{node_type} slot {index} -> pool {}", pool.id);
            Slot { index, pool }
        })
        .collect()
}

//! One-time startup: neighbor deduplication and root selection.

use crate::NodeStateMachine;
use bfstree_types::{LinkId, NodeId, Topology, TopologyError};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Startup configuration.
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    /// The single distinguished root, fixed before the run.
    pub root: NodeId,

    /// Offset from the start of the run at which the root's self-trigger fires.
    pub trigger_at: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            root: NodeId(0),
            trigger_at: Duration::from_secs(10),
        }
    }
}

impl BootstrapConfig {
    /// Set the root.
    pub fn with_root(mut self, root: NodeId) -> Self {
        self.root = root;
        self
    }

    /// Set the self-trigger time.
    pub fn with_trigger_at(mut self, trigger_at: Duration) -> Self {
        self.trigger_at = trigger_at;
        self
    }
}

/// Result of bootstrap: every node, idle, with a frozen neighbor registry.
#[derive(Debug)]
pub struct Bootstrapped {
    pub nodes: BTreeMap<NodeId, NodeStateMachine>,

    /// Parallel links disabled before any traffic, each listed once.
    pub disabled_links: Vec<LinkId>,
}

/// Build every node from the topology.
///
/// Runs before the root's self-trigger is scheduled and before any message
/// can exist, so nothing here races with the protocol.
pub fn bootstrap<T: Topology + ?Sized>(
    topology: &T,
    config: &BootstrapConfig,
) -> Result<Bootstrapped, TopologyError> {
    let ids = topology.nodes();
    if ids.is_empty() {
        return Err(TopologyError::Empty);
    }
    if !topology.contains(config.root) {
        return Err(TopologyError::RootNotInTopology(config.root));
    }

    let mut nodes = BTreeMap::new();
    let mut disabled = BTreeSet::new();
    for id in ids {
        let registry = topology.registry_for(id)?;
        for link in registry.disabled_links() {
            debug!(node = %id, link = %link, "Disabled duplicate link");
            disabled.insert(*link);
        }
        for peer in registry.iter() {
            if let Some(link) = registry.link_to(peer) {
                trace!(node = %id, peer = %peer, link = %link, "Live link");
            }
        }

        let node = if id == config.root {
            NodeStateMachine::new_root(id, registry)
        } else {
            NodeStateMachine::new(id, registry)
        };
        nodes.insert(id, node);
    }

    info!(
        nodes = nodes.len(),
        root = %config.root,
        disabled_links = disabled.len(),
        "Bootstrap complete"
    );

    Ok(Bootstrapped {
        nodes,
        disabled_links: disabled.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfstree_types::{Layer, StaticTopology};

    #[test]
    fn test_bootstrap_marks_root_and_dedups() {
        let mut topology = StaticTopology::path(3);
        let duplicate = topology.add_link(NodeId(1), NodeId(2)).unwrap();

        let result = bootstrap(&topology, &BootstrapConfig::default()).unwrap();
        assert_eq!(result.disabled_links, vec![duplicate]);

        let root = &result.nodes[&NodeId(0)];
        assert!(root.is_root());
        assert_eq!(root.layer(), Layer::ROOT);

        let middle = &result.nodes[&NodeId(1)];
        assert!(!middle.is_root());
        assert_eq!(middle.layer(), Layer::UNSET);
        assert_eq!(middle.registry().len(), 2);
    }

    #[test]
    fn test_bootstrap_rejects_unknown_root() {
        let topology = StaticTopology::path(3);
        let config = BootstrapConfig::default().with_root(NodeId(7));
        assert_eq!(
            bootstrap(&topology, &config).unwrap_err(),
            TopologyError::RootNotInTopology(NodeId(7))
        );
    }
}

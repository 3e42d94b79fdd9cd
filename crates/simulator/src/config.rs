//! Configuration types for the simulator.

use crate::shapes::TopologyShape;
use bfstree_simulation::{BootstrapConfig, LinkOrdering, NetworkConfig};
use bfstree_types::NodeId;
use std::time::Duration;

/// Configuration for a simulation run.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Shape of the generated topology. Ignored when a topology is supplied.
    pub shape: TopologyShape,

    /// Number of nodes to generate.
    pub nodes: u64,

    /// Parallel copies of random existing links to add after generation.
    pub duplicate_links: usize,

    /// Root and self-trigger time.
    pub bootstrap: BootstrapConfig,

    /// Link latency and ordering.
    pub network: NetworkConfig,

    /// Random seed for topology generation and latencies.
    pub seed: u64,
}

impl SimulatorConfig {
    /// Create a new simulator configuration.
    pub fn new(shape: TopologyShape, nodes: u64) -> Self {
        Self {
            shape,
            nodes,
            duplicate_links: 0,
            bootstrap: BootstrapConfig::default(),
            network: NetworkConfig::default(),
            seed: 12345,
        }
    }

    /// Set the root node.
    pub fn with_root(mut self, root: NodeId) -> Self {
        self.bootstrap = self.bootstrap.with_root(root);
        self
    }

    /// Set when the root wakes up.
    pub fn with_trigger_at(mut self, at: Duration) -> Self {
        self.bootstrap = self.bootstrap.with_trigger_at(at);
        self
    }

    /// Set the network configuration.
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set the link ordering.
    pub fn with_ordering(mut self, ordering: LinkOrdering) -> Self {
        self.network = self.network.with_ordering(ordering);
        self
    }

    /// Add duplicate parallel links.
    pub fn with_duplicate_links(mut self, count: usize) -> Self {
        self.duplicate_links = count;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(TopologyShape::default(), 16)
    }
}

//! Builds the topology, runs the simulation, and summarizes the outcome.

use crate::config::SimulatorConfig;
use bfstree_node::{NodeReport, NodeStateMachine};
use bfstree_simulation::SimulationRunner;
use bfstree_types::{Layer, NodeId, StaticTopology, Topology, TopologyError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Outcome of one simulated run.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub root: NodeId,
    pub seed: u64,
    pub node_count: usize,
    pub link_count: usize,

    /// Parallel links disabled at bootstrap.
    pub disabled_links: usize,

    pub events_processed: u64,
    pub messages_sent: BTreeMap<String, u64>,
    pub reparents: u64,

    /// Simulated time of the last delivered event, in milliseconds.
    pub finished_at_ms: u64,

    /// Nodes the root's probes never reached.
    pub unreached: Vec<NodeId>,

    /// Every node's layer equals its hop distance from the root.
    pub converged: bool,

    /// Per-node dumps in id order.
    pub nodes: Vec<NodeReport>,
}

impl SimulationReport {
    pub fn total_messages(&self) -> u64 {
        self.messages_sent.values().sum()
    }

    /// Print per-node dumps followed by a summary.
    pub fn print(&self) {
        for node in &self.nodes {
            println!("{node}");
        }
        println!();
        println!("=== Simulation Summary ===");
        println!("Root:            {}", self.root);
        println!("Seed:            {}", self.seed);
        println!(
            "Nodes / links:   {} / {} ({} disabled)",
            self.node_count, self.link_count, self.disabled_links
        );
        println!("Events:          {}", self.events_processed);
        for (kind, count) in &self.messages_sent {
            println!("  {kind:<16} {count}");
        }
        println!("Reparents:       {}", self.reparents);
        println!("Finished at:     {} ms", self.finished_at_ms);
        if !self.unreached.is_empty() {
            println!("Unreached:       {}", self.unreached.len());
        }
        println!("Converged:       {}", self.converged);
    }
}

/// Runs the protocol once on a fixed topology.
pub struct Simulator {
    config: SimulatorConfig,
    topology: StaticTopology,
}

impl Simulator {
    /// Generate the configured topology, then add any duplicate links.
    pub fn new(config: SimulatorConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut topology = config.shape.build(config.nodes, &mut rng);
        topology.duplicate_random_links(config.duplicate_links, &mut rng);
        Self { config, topology }
    }

    /// Use a topology built elsewhere, e.g. from a file.
    pub fn with_topology(config: SimulatorConfig, topology: StaticTopology) -> Self {
        Self { config, topology }
    }

    pub fn topology(&self) -> &StaticTopology {
        &self.topology
    }

    /// Run until quiescent and summarize.
    pub fn run(&self) -> Result<SimulationReport, TopologyError> {
        let root = self.config.bootstrap.root;
        info!(
            nodes = self.topology.node_count(),
            links = self.topology.link_count(),
            root = %root,
            seed = self.config.seed,
            "Starting simulation"
        );

        let mut runner = SimulationRunner::new(
            &self.topology,
            self.config.bootstrap.clone(),
            self.config.network.clone(),
            self.config.seed,
        )?;
        let stats = runner.run_until_quiescent().clone();
        if let Err(violation) = runner.check_invariants() {
            warn!(%violation, "Invariant violated at quiescence");
        }

        let distances = self.topology.hop_distances(root);
        let converged = runner.nodes().all(|node| layer_matches(node, &distances));
        let unreached = runner
            .nodes()
            .filter(|node| !node.layer().is_set())
            .map(NodeStateMachine::id)
            .collect();

        let report = SimulationReport {
            root,
            seed: self.config.seed,
            node_count: self.topology.node_count(),
            link_count: self.topology.link_count(),
            disabled_links: runner.disabled_links().len(),
            events_processed: stats.events_processed,
            messages_sent: stats
                .messages_sent
                .iter()
                .map(|(kind, count)| (kind.to_string(), *count))
                .collect(),
            reparents: stats.reparents,
            finished_at_ms: stats.last_event_at.as_millis() as u64,
            unreached,
            converged,
            nodes: runner.reports(),
        };
        info!(
            messages = report.total_messages(),
            converged = report.converged,
            "Simulation finished"
        );
        Ok(report)
    }
}

/// Unreachable nodes converge by staying unset.
fn layer_matches(node: &NodeStateMachine, distances: &BTreeMap<NodeId, u32>) -> bool {
    match distances.get(&node.id()) {
        Some(hops) => node.layer() == Layer(*hops),
        None => !node.layer().is_set(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TopologyShape;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_grid_run_converges() {
        let config = SimulatorConfig::new(TopologyShape::Grid, 16).with_seed(3);
        let report = Simulator::new(config).run().unwrap();

        assert!(report.converged);
        assert!(report.unreached.is_empty());
        assert_eq!(report.nodes.len(), 16);
        assert_eq!(report.nodes[15].layer, Layer(6));
        assert!(logs_contain("Simulation finished"));
    }

    #[traced_test]
    #[test]
    fn test_duplicate_links_are_counted() {
        let config = SimulatorConfig::new(TopologyShape::Ring, 8)
            .with_duplicate_links(5)
            .with_seed(11);
        let simulator = Simulator::new(config);
        assert_eq!(simulator.topology().link_count(), 13);

        let report = simulator.run().unwrap();
        assert_eq!(report.disabled_links, 5);
        assert!(report.converged);
    }

    #[traced_test]
    #[test]
    fn test_isolated_node_is_unreached_but_converged() {
        let topology =
            StaticTopology::from_links(3, [(NodeId(0), NodeId(1))]).unwrap();
        let simulator = Simulator::with_topology(SimulatorConfig::default(), topology);
        let report = simulator.run().unwrap();

        assert_eq!(report.unreached, vec![NodeId(2)]);
        assert!(report.converged);
    }

    #[traced_test]
    #[test]
    fn test_report_serializes() {
        let config = SimulatorConfig::new(TopologyShape::Path, 3);
        let report = Simulator::new(config).run().unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["messages_sent"]["tree.probe"], 2);
        assert_eq!(json["nodes"][2]["layer"], 2);
        assert_eq!(json["converged"], true);
    }
}

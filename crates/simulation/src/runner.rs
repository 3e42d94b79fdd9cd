//! Simulation runner.

use crate::event_queue::{EventPriority, EventQueue};
use crate::network::{NetworkConfig, SimulatedNetwork};
use bfstree_core::{Action, Event, StateMachine};
use bfstree_node::{
    bootstrap, BootstrapConfig, Bootstrapped, InvariantViolation, NodeReport, NodeStateMachine,
};
use bfstree_types::{LinkId, NodeId, Topology, TopologyError};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Counters collected while a simulation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Events handed to nodes.
    pub events_processed: u64,

    /// Messages sent, by message type.
    pub messages_sent: BTreeMap<&'static str, u64>,

    /// Parent changes announced by nodes.
    pub reparents: u64,

    /// Logical time of the last processed event.
    pub last_event_at: Duration,
}

impl SimulationStats {
    /// Messages of one type.
    pub fn sent(&self, type_name: &str) -> u64 {
        self.messages_sent.get(type_name).copied().unwrap_or(0)
    }

    /// All messages of every type.
    pub fn total_messages(&self) -> u64 {
        self.messages_sent.values().sum()
    }
}

/// Single-process delivery substrate for the whole graph.
///
/// Nodes are handled one event at a time, each to completion, in the order
/// the [`SimulatedNetwork`] schedules deliveries.
pub struct SimulationRunner {
    nodes: BTreeMap<NodeId, NodeStateMachine>,
    queue: EventQueue,
    network: SimulatedNetwork,
    root: NodeId,
    disabled_links: Vec<LinkId>,
    now: Duration,
    stats: SimulationStats,
}

impl SimulationRunner {
    /// Bootstrap every node and schedule the root's self-trigger.
    pub fn new<T: Topology + ?Sized>(
        topology: &T,
        bootstrap_config: BootstrapConfig,
        network_config: NetworkConfig,
        seed: u64,
    ) -> Result<Self, TopologyError> {
        let Bootstrapped {
            nodes,
            disabled_links,
        } = bootstrap(topology, &bootstrap_config)?;

        let mut runner = Self {
            nodes,
            queue: EventQueue::default(),
            network: SimulatedNetwork::new(network_config, seed),
            root: bootstrap_config.root,
            disabled_links,
            now: Duration::ZERO,
            stats: SimulationStats::default(),
        };
        runner.schedule_self_trigger(bootstrap_config.root, bootstrap_config.trigger_at);
        Ok(runner)
    }

    /// Arrange a spontaneous wake-up for `node` at `at`.
    pub fn schedule_self_trigger(&mut self, node: NodeId, at: Duration) {
        debug!(node = %node, at = ?at, "Scheduling self-trigger");
        self.queue
            .push(at, EventPriority::Timer, node, Event::SelfTrigger);
    }

    /// Process the next event. Returns false once nothing is left.
    pub fn step(&mut self) -> bool {
        let Some((key, event)) = self.queue.pop() else {
            return false;
        };
        self.now = key.time;

        let Some(node) = self.nodes.get_mut(&key.node) else {
            warn!(node = %key.node, "Event for unknown node dropped");
            return true;
        };
        trace!(node = %key.node, event = event.type_name(), time = ?self.now, "Delivering");
        node.set_time(self.now);
        let actions = node.handle(event);

        self.stats.events_processed += 1;
        self.stats.last_event_at = self.now;
        for action in actions {
            self.process_action(key.node, action);
        }
        true
    }

    fn process_action(&mut self, from: NodeId, action: Action) {
        trace!(node = %from, action = action.type_name(), "Processing action");
        match action {
            Action::Send { to, message } => {
                if !self.nodes.contains_key(&to) {
                    warn!(from = %from, to = %to, "Send to unknown node dropped");
                    return;
                }
                let at = self.network.delivery_time(from, to, self.now);
                *self
                    .stats
                    .messages_sent
                    .entry(message.type_name())
                    .or_default() += 1;
                self.queue
                    .push(at, EventPriority::Network, to, message.into_event(from));
            }
            Action::Reparented { .. } => {
                self.stats.reparents += 1;
            }
        }
    }

    /// Run until no event is left.
    pub fn run_until_quiescent(&mut self) -> &SimulationStats {
        while self.step() {}
        debug!(
            events = self.stats.events_processed,
            messages = self.stats.total_messages(),
            at = ?self.now,
            "Simulation quiescent"
        );
        &self.stats
    }

    /// Run every event due within `duration` from now.
    pub fn run_for(&mut self, duration: Duration) {
        let end = self.now + duration;
        while self.queue.peek_time().is_some_and(|t| t <= end) {
            self.step();
        }
        self.now = end;
    }

    /// Whether no message or trigger is pending.
    pub fn is_quiescent(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events still queued.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Current logical time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// The configured root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// A node's state machine.
    pub fn node(&self, id: NodeId) -> Option<&NodeStateMachine> {
        self.nodes.get(&id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeStateMachine> {
        self.nodes.values()
    }

    /// Links disabled at bootstrap.
    pub fn disabled_links(&self) -> &[LinkId] {
        &self.disabled_links
    }

    /// Collected statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Per-node dumps in id order. Meaningful once quiescent.
    pub fn reports(&self) -> Vec<NodeReport> {
        self.nodes.values().map(|n| n.report()).collect()
    }

    /// Check every node's invariants.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.nodes.values().try_for_each(|n| n.check_invariants())
    }
}

//! Protocol state and message handlers for one node.

use crate::{InvariantViolation, NodeReport};
use bfstree_core::{Action, Event, OutboundMessage, StateMachine};
use bfstree_messages::{Acknowledge, Probe, Reject};
use bfstree_types::{Layer, NeighborRegistry, NodeId};
use indexmap::IndexSet;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// How a node currently classifies one of its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Parent,
    Child,
    Other,
}

/// Protocol state of a single node.
///
/// Owned exclusively by the node; the only way to change it is to feed an
/// [`Event`] through [`StateMachine::handle`].
pub struct NodeStateMachine {
    /// This node's identity.
    id: NodeId,

    /// Deduplicated neighbors, fixed at bootstrap.
    registry: NeighborRegistry,

    /// Whether this node is the configured root.
    is_root: bool,

    /// Current hop-distance estimate. Never increases.
    layer: Layer,

    /// Neighbor whose probe we accepted last.
    parent: Option<NodeId>,

    /// Neighbors that acknowledged one of our probes.
    children: IndexSet<NodeId>,

    /// Neighbors known to be neither parent nor child.
    other: IndexSet<NodeId>,

    /// Whether the self-trigger already fired.
    triggered: bool,

    /// Current logical time.
    now: Duration,
}

impl NodeStateMachine {
    /// Create a non-root node. It stays idle until its first probe arrives.
    pub fn new(id: NodeId, registry: NeighborRegistry) -> Self {
        Self {
            id,
            registry,
            is_root: false,
            layer: Layer::UNSET,
            parent: None,
            children: IndexSet::new(),
            other: IndexSet::new(),
            triggered: false,
            now: Duration::ZERO,
        }
    }

    /// Create the root: layer 0, no parent, permanently.
    pub fn new_root(id: NodeId, registry: NeighborRegistry) -> Self {
        Self {
            is_root: true,
            layer: Layer::ROOT,
            ..Self::new(id, registry)
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &IndexSet<NodeId> {
        &self.children
    }

    pub fn other(&self) -> &IndexSet<NodeId> {
        &self.other
    }

    pub fn registry(&self) -> &NeighborRegistry {
        &self.registry
    }

    /// Which set `peer` is in, if any.
    pub fn classify(&self, peer: NodeId) -> Option<Classification> {
        if self.parent == Some(peer) {
            Some(Classification::Parent)
        } else if self.children.contains(&peer) {
            Some(Classification::Child)
        } else if self.other.contains(&peer) {
            Some(Classification::Other)
        } else {
            None
        }
    }

    /// Read-only snapshot for external reporting.
    ///
    /// Only meaningful once no messages addressing this node are in flight.
    pub fn report(&self) -> NodeReport {
        NodeReport {
            id: self.id,
            parent: self.parent,
            children: self.children.iter().copied().collect(),
            other: self.other.iter().copied().collect(),
            layer: self.layer,
        }
    }

    /// Verify the partition and layer/parent invariants.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.is_root {
            if self.layer != Layer::ROOT || self.parent.is_some() {
                return Err(InvariantViolation::RootDrifted {
                    node: self.id,
                    layer: self.layer,
                    parent: self.parent,
                });
            }
        } else if self.layer.is_set() != self.parent.is_some() {
            return Err(InvariantViolation::LayerParentMismatch {
                node: self.id,
                layer: self.layer,
                parent: self.parent,
            });
        }

        if let Some(parent) = self.parent {
            for (set, members) in [("children", &self.children), ("other", &self.other)] {
                if members.contains(&parent) {
                    return Err(InvariantViolation::ParentClassifiedTwice {
                        node: self.id,
                        parent,
                        set,
                    });
                }
            }
        }

        if let Some(peer) = self.children.iter().find(|p| self.other.contains(*p)) {
            return Err(InvariantViolation::ChildAndOther {
                node: self.id,
                peer: *peer,
            });
        }

        let classified = self
            .parent
            .iter()
            .chain(self.children.iter())
            .chain(self.other.iter());
        for peer in classified {
            if !self.registry.contains(*peer) {
                return Err(InvariantViolation::UnregisteredPeer {
                    node: self.id,
                    peer: *peer,
                });
            }
        }

        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Handlers
    // ═══════════════════════════════════════════════════════════════════════

    /// Scheduled wake-up: offer `layer + 1` to every neighbor.
    pub fn on_self_trigger(&mut self) -> Vec<Action> {
        if self.triggered {
            debug!(node = %self.id, "Ignoring repeated self-trigger");
            return vec![];
        }
        let Some(candidate) = self.layer.next() else {
            warn!(node = %self.id, layer = %self.layer, "Self-trigger without a layer to offer");
            return vec![];
        };
        self.triggered = true;

        info!(
            node = %self.id,
            neighbors = self.registry.len(),
            "Initiating layer broadcast"
        );
        self.broadcast(candidate, None)
    }

    /// A neighbor offers a candidate layer.
    pub fn on_probe(&mut self, from: NodeId, probe: Probe) -> Vec<Action> {
        if !self.is_neighbor(from, "probe") {
            return vec![];
        }

        if probe.layer < self.layer {
            self.accept(from, probe.layer)
        } else {
            self.reject(from, probe.layer)
        }
    }

    /// A neighbor adopted us as its parent.
    pub fn on_acknowledge(&mut self, from: NodeId) -> Vec<Action> {
        if !self.is_neighbor(from, "acknowledge") {
            return vec![];
        }
        if self.parent == Some(from) {
            debug!(node = %self.id, from = %from, "Ignoring stale acknowledge from parent");
            return vec![];
        }

        self.other.shift_remove(&from);
        if self.children.insert(from) {
            debug!(node = %self.id, child = %from, "Added child");
        }
        vec![]
    }

    /// A neighbor declined one of our probes.
    pub fn on_reject(&mut self, from: NodeId) -> Vec<Action> {
        if !self.is_neighbor(from, "reject") {
            return vec![];
        }
        if self.parent == Some(from) {
            debug!(node = %self.id, from = %from, "Ignoring stale reject from parent");
            return vec![];
        }

        self.demote(from);
        vec![]
    }

    fn accept(&mut self, from: NodeId, layer: Layer) -> Vec<Action> {
        let previous = self.parent;
        if let Some(stale) = previous.filter(|p| *p != from) {
            self.other.insert(stale);
        }

        self.layer = layer;
        self.parent = Some(from);
        // An acknowledge from `from` may have been handled before its better probe
        self.children.shift_remove(&from);
        self.other.shift_remove(&from);

        let mut actions = vec![Action::Send {
            to: from,
            message: OutboundMessage::Acknowledge(Acknowledge),
        }];

        if previous != Some(from) {
            info!(
                node = %self.id,
                parent = %from,
                previous = ?previous,
                layer = %layer,
                "Parent node set"
            );
            actions.push(Action::Reparented {
                previous,
                parent: from,
                layer,
            });
        } else {
            debug!(node = %self.id, parent = %from, layer = %layer, "Layer improved via same parent");
        }

        match layer.next() {
            Some(candidate) => actions.extend(self.broadcast(candidate, Some(from))),
            None => warn!(node = %self.id, layer = %layer, "Layer too deep to propagate"),
        }
        actions
    }

    fn reject(&mut self, from: NodeId, layer: Layer) -> Vec<Action> {
        debug!(
            node = %self.id,
            from = %from,
            offered = %layer,
            layer = %self.layer,
            "Rejecting probe"
        );
        if self.parent == Some(from) {
            // Overtaken by a better probe from the same parent; stays classified as parent
            trace!(node = %self.id, parent = %from, "Keeping parent classification");
        } else {
            self.demote(from);
        }
        vec![Action::Send {
            to: from,
            message: OutboundMessage::Reject(Reject),
        }]
    }

    fn demote(&mut self, peer: NodeId) {
        if self.children.shift_remove(&peer) {
            debug!(node = %self.id, peer = %peer, "Removed child");
        }
        if self.other.insert(peer) {
            debug!(node = %self.id, peer = %peer, "Added other");
        }
    }

    fn broadcast(&self, candidate: Layer, except: Option<NodeId>) -> Vec<Action> {
        let probe = Probe::new(candidate, self.now);
        self.registry
            .iter()
            .filter(|n| Some(*n) != except)
            .map(|to| Action::Send {
                to,
                message: OutboundMessage::Probe(probe),
            })
            .collect()
    }

    fn is_neighbor(&self, from: NodeId, kind: &'static str) -> bool {
        let known = self.registry.contains(from);
        if !known {
            warn!(node = %self.id, from = %from, kind, "Dropping message from unregistered peer");
        }
        known
    }
}

impl StateMachine for NodeStateMachine {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        trace!(node = %self.id, event = event.type_name(), "Handling event");
        match event {
            Event::SelfTrigger => self.on_self_trigger(),
            Event::ProbeReceived { from, probe } => self.on_probe(from, probe),
            Event::AcknowledgeReceived { from } => self.on_acknowledge(from),
            Event::RejectReceived { from } => self.on_reject(from),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}

impl std::fmt::Debug for NodeStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStateMachine")
            .field("id", &self.id)
            .field("layer", &self.layer)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("other", &self.other)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, VecDeque};
    use tracing_test::traced_test;

    fn node(id: u64, neighbors: &[u64]) -> NodeStateMachine {
        let registry =
            NeighborRegistry::from_neighbors(NodeId(id), neighbors.iter().map(|n| NodeId(*n)))
                .unwrap();
        NodeStateMachine::new(NodeId(id), registry)
    }

    fn root(id: u64, neighbors: &[u64]) -> NodeStateMachine {
        let registry =
            NeighborRegistry::from_neighbors(NodeId(id), neighbors.iter().map(|n| NodeId(*n)))
                .unwrap();
        NodeStateMachine::new_root(NodeId(id), registry)
    }

    fn probe(layer: u32) -> Probe {
        Probe::new(Layer(layer), Duration::ZERO)
    }

    fn sends(actions: &[Action]) -> Vec<(NodeId, OutboundMessage)> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send { to, message } => Some((*to, *message)),
                _ => None,
            })
            .collect()
    }

    fn probes_to(actions: &[Action]) -> Vec<(NodeId, Layer)> {
        sends(actions)
            .into_iter()
            .filter_map(|(to, m)| match m {
                OutboundMessage::Probe(p) => Some((to, p.layer)),
                _ => None,
            })
            .collect()
    }

    /// Deliver every send in global FIFO order until nothing is left.
    fn run_fifo(nodes: &mut BTreeMap<NodeId, NodeStateMachine>, start: NodeId) {
        let mut queue: VecDeque<(NodeId, NodeId, OutboundMessage)> = VecDeque::new();
        let actions = nodes.get_mut(&start).unwrap().handle(Event::SelfTrigger);
        queue.extend(sends(&actions).into_iter().map(|(to, m)| (start, to, m)));

        while let Some((from, to, message)) = queue.pop_front() {
            let receiver = nodes.get_mut(&to).unwrap();
            let actions = receiver.handle(message.into_event(from));
            receiver.check_invariants().unwrap();
            queue.extend(sends(&actions).into_iter().map(|(next, m)| (to, next, m)));
        }
    }

    #[traced_test]
    #[test]
    fn test_path_of_four_builds_chain() {
        let mut nodes = BTreeMap::new();
        nodes.insert(NodeId(0), root(0, &[1]));
        nodes.insert(NodeId(1), node(1, &[0, 2]));
        nodes.insert(NodeId(2), node(2, &[1, 3]));
        nodes.insert(NodeId(3), node(3, &[2]));

        run_fifo(&mut nodes, NodeId(0));

        let layers: Vec<_> = nodes.values().map(|n| n.layer()).collect();
        assert_eq!(layers, vec![Layer(0), Layer(1), Layer(2), Layer(3)]);

        let parents: Vec<_> = nodes.values().map(|n| n.parent()).collect();
        assert_eq!(
            parents,
            vec![None, Some(NodeId(0)), Some(NodeId(1)), Some(NodeId(2))]
        );

        let children: Vec<Vec<NodeId>> = nodes
            .values()
            .map(|n| n.children().iter().copied().collect())
            .collect();
        assert_eq!(
            children,
            vec![vec![NodeId(1)], vec![NodeId(2)], vec![NodeId(3)], vec![]]
        );

        assert!(nodes.values().all(|n| n.other().is_empty()));
    }

    #[traced_test]
    #[test]
    fn test_path_first_hop_messages() {
        let mut a = root(0, &[1]);
        let mut b = node(1, &[0, 2]);

        let actions = a.handle(Event::SelfTrigger);
        assert_eq!(probes_to(&actions), vec![(NodeId(1), Layer(1))]);

        let actions = b.on_probe(NodeId(0), probe(1));
        assert_eq!(b.layer(), Layer(1));
        assert_eq!(b.parent(), Some(NodeId(0)));
        assert_eq!(
            sends(&actions)[0],
            (NodeId(0), OutboundMessage::Acknowledge(Acknowledge))
        );
        assert_eq!(probes_to(&actions), vec![(NodeId(2), Layer(2))]);

        a.on_acknowledge(NodeId(1));
        assert_eq!(a.classify(NodeId(1)), Some(Classification::Child));
    }

    #[traced_test]
    #[test]
    fn test_reparenting_to_shorter_path() {
        // P1 = 1, P2 = 2, plus one more neighbor 3
        let mut x = node(9, &[1, 2, 3]);

        x.on_probe(NodeId(1), probe(5));
        assert_eq!(x.parent(), Some(NodeId(1)));
        assert_eq!(x.layer(), Layer(5));

        let actions = x.on_probe(NodeId(2), probe(3));
        assert_eq!(x.parent(), Some(NodeId(2)));
        assert_eq!(x.layer(), Layer(3));
        assert_eq!(x.classify(NodeId(1)), Some(Classification::Other));

        assert_eq!(
            sends(&actions)[0],
            (NodeId(2), OutboundMessage::Acknowledge(Acknowledge))
        );
        assert!(actions.contains(&Action::Reparented {
            previous: Some(NodeId(1)),
            parent: NodeId(2),
            layer: Layer(3),
        }));
        // Re-broadcast goes everywhere except the new parent, old parent included
        assert_eq!(
            probes_to(&actions),
            vec![(NodeId(1), Layer(4)), (NodeId(3), Layer(4))]
        );
        x.check_invariants().unwrap();
    }

    #[traced_test]
    #[test]
    fn test_reject_leaves_layer_and_parent_alone() {
        let mut y = node(5, &[4, 6]);
        y.on_probe(NodeId(4), probe(2));

        let actions = y.on_probe(NodeId(6), probe(4));
        assert_eq!(
            actions,
            vec![Action::Send {
                to: NodeId(6),
                message: OutboundMessage::Reject(Reject),
            }]
        );
        assert_eq!(y.layer(), Layer(2));
        assert_eq!(y.parent(), Some(NodeId(4)));
        assert_eq!(y.classify(NodeId(6)), Some(Classification::Other));
    }

    #[traced_test]
    #[test]
    fn test_equal_layer_is_rejected() {
        let mut y = node(5, &[4, 6]);
        y.on_probe(NodeId(4), probe(2));
        let actions = y.on_probe(NodeId(6), probe(2));
        assert_eq!(sends(&actions), vec![(NodeId(6), OutboundMessage::Reject(Reject))]);
        assert_eq!(y.parent(), Some(NodeId(4)));
    }

    #[traced_test]
    #[test]
    fn test_rejected_probe_demotes_child() {
        let mut y = node(5, &[4, 6]);
        y.on_probe(NodeId(4), probe(2));
        y.on_acknowledge(NodeId(6));
        assert_eq!(y.classify(NodeId(6)), Some(Classification::Child));

        y.on_probe(NodeId(6), probe(7));
        assert_eq!(y.classify(NodeId(6)), Some(Classification::Other));
        assert!(y.children().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_root_never_moves() {
        let mut r = root(0, &[1, 2]);
        let actions = r.on_probe(NodeId(1), probe(0));
        assert_eq!(sends(&actions), vec![(NodeId(1), OutboundMessage::Reject(Reject))]);
        r.on_probe(NodeId(2), probe(1));

        assert_eq!(r.layer(), Layer::ROOT);
        assert_eq!(r.parent(), None);
        r.check_invariants().unwrap();
    }

    #[traced_test]
    #[test]
    fn test_self_trigger_fires_once() {
        let mut r = root(0, &[1, 2, 3]);
        let actions = r.handle(Event::SelfTrigger);
        assert_eq!(
            probes_to(&actions),
            vec![(NodeId(1), Layer(1)), (NodeId(2), Layer(1)), (NodeId(3), Layer(1))]
        );
        assert!(r.handle(Event::SelfTrigger).is_empty());
    }

    #[traced_test]
    #[test]
    fn test_self_trigger_on_unreached_node_is_ignored() {
        let mut n = node(3, &[1]);
        assert!(n.handle(Event::SelfTrigger).is_empty());
        assert_eq!(n.layer(), Layer::UNSET);
    }

    #[traced_test]
    #[test]
    fn test_probe_carries_logical_time() {
        let mut r = root(0, &[1]);
        r.set_time(Duration::from_secs(10));
        let actions = r.handle(Event::SelfTrigger);
        match sends(&actions)[0].1 {
            OutboundMessage::Probe(p) => assert_eq!(p.sent_at, Duration::from_secs(10)),
            other => panic!("expected probe, got {other:?}"),
        }
    }

    #[traced_test]
    #[test]
    fn test_unregistered_sender_is_ignored() {
        let mut n = node(1, &[0]);
        assert!(n.on_probe(NodeId(42), probe(1)).is_empty());
        assert!(n.on_acknowledge(NodeId(42)).is_empty());
        assert!(n.on_reject(NodeId(42)).is_empty());
        assert_eq!(n.layer(), Layer::UNSET);
        assert_eq!(n.classify(NodeId(42)), None);
        assert!(logs_contain("unregistered peer"));
    }

    #[traced_test]
    #[test]
    fn test_acknowledge_is_idempotent_and_promotes_from_other() {
        let mut n = node(1, &[0, 2]);
        n.on_probe(NodeId(0), probe(1));
        n.on_reject(NodeId(2));
        assert_eq!(n.classify(NodeId(2)), Some(Classification::Other));

        n.on_acknowledge(NodeId(2));
        n.on_acknowledge(NodeId(2));
        assert_eq!(n.children().len(), 1);
        assert!(n.other().is_empty());
        n.check_invariants().unwrap();
    }

    #[traced_test]
    #[test]
    fn test_reject_demotes_child() {
        let mut n = node(1, &[0, 2]);
        n.on_probe(NodeId(0), probe(1));
        n.on_acknowledge(NodeId(2));
        n.on_reject(NodeId(2));
        n.on_reject(NodeId(2));
        assert_eq!(n.classify(NodeId(2)), Some(Classification::Other));
        assert_eq!(n.other().len(), 1);
    }

    #[traced_test]
    #[test]
    fn test_stale_replies_from_parent_are_ignored() {
        let mut n = node(1, &[0, 2]);
        n.on_probe(NodeId(0), probe(1));

        n.on_acknowledge(NodeId(0));
        n.on_reject(NodeId(0));
        assert_eq!(n.classify(NodeId(0)), Some(Classification::Parent));
        n.check_invariants().unwrap();
    }

    #[traced_test]
    #[test]
    fn test_overtaken_probe_from_parent_is_rejected_but_parent_kept() {
        // Parent sent 5 then 3; 3 overtook 5 on the link
        let mut n = node(1, &[0, 2]);
        n.on_probe(NodeId(0), probe(3));
        let actions = n.on_probe(NodeId(0), probe(5));

        assert_eq!(
            actions,
            vec![Action::Send {
                to: NodeId(0),
                message: OutboundMessage::Reject(Reject),
            }]
        );
        assert_eq!(n.layer(), Layer(3));
        assert_eq!(n.classify(NodeId(0)), Some(Classification::Parent));
        assert!(n.other().is_empty());
        n.check_invariants().unwrap();
    }

    #[traced_test]
    #[test]
    fn test_better_probe_from_same_parent_is_acknowledged_again() {
        let mut n = node(1, &[0, 2]);
        n.on_probe(NodeId(0), probe(5));
        let actions = n.on_probe(NodeId(0), probe(3));

        assert_eq!(n.layer(), Layer(3));
        assert!(!actions.iter().any(|a| matches!(a, Action::Reparented { .. })));
        assert_eq!(
            sends(&actions),
            vec![
                (NodeId(0), OutboundMessage::Acknowledge(Acknowledge)),
                (NodeId(2), OutboundMessage::Probe(probe(4))),
            ]
        );
    }

    #[traced_test]
    #[test]
    fn test_accept_pulls_sender_out_of_children() {
        // An old acknowledge from 2 lands before its better probe
        let mut n = node(1, &[0, 2]);
        n.on_probe(NodeId(0), probe(6));
        n.on_acknowledge(NodeId(2));
        n.on_probe(NodeId(2), probe(2));

        assert_eq!(n.parent(), Some(NodeId(2)));
        assert!(n.children().is_empty());
        assert_eq!(n.classify(NodeId(0)), Some(Classification::Other));
        n.check_invariants().unwrap();
    }

    #[traced_test]
    #[test]
    fn test_layers_never_increase() {
        let mut n = node(1, &[0, 2, 3]);
        let mut last = n.layer();
        for (from, layer) in [(0, 7), (2, 9), (3, 4), (0, 4), (2, 3), (3, 8)] {
            n.on_probe(NodeId(from), probe(layer));
            assert!(n.layer() <= last);
            last = n.layer();
            n.check_invariants().unwrap();
        }
        assert_eq!(n.layer(), Layer(3));
        assert_eq!(n.parent(), Some(NodeId(2)));
    }

    #[test]
    fn test_check_invariants_flags_double_classification() {
        let mut n = node(1, &[0, 2]);
        n.on_probe(NodeId(0), probe(1));
        n.children.insert(NodeId(2));
        n.other.insert(NodeId(2));
        assert_eq!(
            n.check_invariants(),
            Err(InvariantViolation::ChildAndOther {
                node: NodeId(1),
                peer: NodeId(2)
            })
        );
    }

    #[test]
    fn test_report_snapshot() {
        let mut n = node(1, &[0, 2, 3]);
        n.on_probe(NodeId(0), probe(1));
        n.on_acknowledge(NodeId(2));
        n.on_reject(NodeId(3));

        let report = n.report();
        assert_eq!(report.id, NodeId(1));
        assert_eq!(report.parent, Some(NodeId(0)));
        assert_eq!(report.children, vec![NodeId(2)]);
        assert_eq!(report.other, vec![NodeId(3)]);
        assert_eq!(report.layer, Layer(1));
    }
}

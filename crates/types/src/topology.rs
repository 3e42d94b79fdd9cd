//! Topology trait, static implementation, and the per-node neighbor registry.

use crate::{LinkId, NodeId};
use indexmap::IndexMap;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// One raw link as seen from a node: the link id and the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawLink {
    pub id: LinkId,
    pub remote: NodeId,
}

/// Errors that can occur when building or validating topology information.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// A link connects a node to itself.
    #[error("{link} connects {node} to itself")]
    SelfLoop { node: NodeId, link: LinkId },

    /// A link or query references a node the topology does not declare.
    #[error("{0} is not part of the topology")]
    UnknownNode(NodeId),

    /// The same node was declared twice.
    #[error("{0} declared more than once")]
    DuplicateNode(NodeId),

    /// The configured root is not a node of the topology.
    #[error("root {0} is not part of the topology")]
    RootNotInTopology(NodeId),

    /// The topology has no nodes at all.
    #[error("topology has no nodes")]
    Empty,
}

/// Topology query used by bootstrap.
///
/// Only consulted once at startup: the protocol itself never looks at the
/// topology, it only talks to the neighbors in its registry.
pub trait Topology: Send + Sync {
    /// All nodes, in ascending id order.
    fn nodes(&self) -> Vec<NodeId>;

    /// The raw links incident to `node`, in declaration order.
    ///
    /// Parallel links to the same peer are all returned.
    fn raw_links(&self, node: NodeId) -> Vec<RawLink>;

    // Derived methods

    /// Number of nodes.
    fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// Whether `node` is declared.
    fn contains(&self, node: NodeId) -> bool {
        self.nodes().contains(&node)
    }

    /// Build the deduplicated neighbor registry for `node`.
    fn registry_for(&self, node: NodeId) -> Result<NeighborRegistry, TopologyError> {
        if !self.contains(node) {
            return Err(TopologyError::UnknownNode(node));
        }
        NeighborRegistry::from_links(node, self.raw_links(node))
    }
}

/// Static topology built from an explicit link list.
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    nodes: BTreeSet<NodeId>,
    links: Vec<(LinkId, NodeId, NodeId)>,
    incident: HashMap<NodeId, Vec<RawLink>>,
}

impl StaticTopology {
    /// Create a topology with the given nodes and no links.
    pub fn new(nodes: impl IntoIterator<Item = NodeId>) -> Result<Self, TopologyError> {
        let mut topology = Self::default();
        for node in nodes {
            if !topology.nodes.insert(node) {
                return Err(TopologyError::DuplicateNode(node));
            }
        }
        if topology.nodes.is_empty() {
            return Err(TopologyError::Empty);
        }
        Ok(topology)
    }

    /// Create a topology of nodes `0..n` with the given links.
    pub fn from_links(
        n: u64,
        links: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> Result<Self, TopologyError> {
        let mut topology = Self::new((0..n).map(NodeId))?;
        for (a, b) in links {
            topology.add_link(a, b)?;
        }
        Ok(topology)
    }

    /// Declare a bidirectional link between `a` and `b`.
    ///
    /// Parallel links are accepted here; bootstrap disables the extras.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) -> Result<LinkId, TopologyError> {
        for node in [a, b] {
            if !self.nodes.contains(&node) {
                return Err(TopologyError::UnknownNode(node));
            }
        }
        let id = LinkId(self.links.len() as u32);
        if a == b {
            return Err(TopologyError::SelfLoop { node: a, link: id });
        }
        self.push_link(id, a, b);
        Ok(id)
    }

    fn push_link(&mut self, id: LinkId, a: NodeId, b: NodeId) {
        self.links.push((id, a, b));
        self.incident
            .entry(a)
            .or_default()
            .push(RawLink { id, remote: b });
        self.incident
            .entry(b)
            .or_default()
            .push(RawLink { id, remote: a });
    }

    fn generated(n: u64, edges: impl IntoIterator<Item = (u64, u64)>) -> Self {
        let mut topology = Self {
            nodes: (0..n.max(1)).map(NodeId).collect(),
            ..Default::default()
        };
        for (a, b) in edges {
            let id = LinkId(topology.links.len() as u32);
            topology.push_link(id, NodeId(a), NodeId(b));
        }
        topology
    }

    /// Path `0 - 1 - ... - (n-1)`.
    pub fn path(n: u64) -> Self {
        Self::generated(n, (1..n).map(|i| (i - 1, i)))
    }

    /// Ring `0 - 1 - ... - (n-1) - 0`. Falls back to a path below 3 nodes.
    pub fn ring(n: u64) -> Self {
        if n < 3 {
            return Self::path(n);
        }
        Self::generated(n, (0..n).map(|i| (i, (i + 1) % n)))
    }

    /// Star with node 0 at the center.
    pub fn star(n: u64) -> Self {
        Self::generated(n, (1..n).map(|i| (0, i)))
    }

    /// Complete graph on `n` nodes.
    pub fn complete(n: u64) -> Self {
        Self::generated(
            n,
            (0..n).flat_map(|a| ((a + 1)..n).map(move |b| (a, b))),
        )
    }

    /// `width x height` grid, row-major ids.
    pub fn grid(width: u64, height: u64) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut edges = Vec::new();
        for row in 0..height {
            for col in 0..width {
                let id = row * width + col;
                if col + 1 < width {
                    edges.push((id, id + 1));
                }
                if row + 1 < height {
                    edges.push((id, id + width));
                }
            }
        }
        Self::generated(width * height, edges)
    }

    /// Random connected graph: a random spanning tree plus up to
    /// `extra_links` additional distinct links.
    pub fn random_connected(n: u64, extra_links: usize, rng: &mut impl Rng) -> Self {
        let n = n.max(1);
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for i in 1..n {
            let j = rng.gen_range(0..i);
            seen.insert((j, i));
            edges.push((j, i));
        }
        if n > 1 {
            for _ in 0..extra_links {
                let a = rng.gen_range(0..n);
                let b = rng.gen_range(0..n);
                let pair = (a.min(b), a.max(b));
                if a != b && seen.insert(pair) {
                    edges.push(pair);
                }
            }
        }
        Self::generated(n, edges)
    }

    /// Add `count` parallel copies of randomly chosen existing links.
    pub fn duplicate_random_links(&mut self, count: usize, rng: &mut impl Rng) {
        if self.links.is_empty() {
            return;
        }
        for _ in 0..count {
            let (_, a, b) = self.links[rng.gen_range(0..self.links.len())];
            let id = LinkId(self.links.len() as u32);
            self.push_link(id, a, b);
        }
    }

    /// All declared links as `(id, a, b)`.
    pub fn links(&self) -> &[(LinkId, NodeId, NodeId)] {
        &self.links
    }

    /// Number of raw links, parallel links included.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Hop distances from `root` over the raw links.
    ///
    /// This is a global view and is only meant for external observers that
    /// check a converged run; nodes never see it.
    pub fn hop_distances(&self, root: NodeId) -> BTreeMap<NodeId, u32> {
        let mut distances = BTreeMap::new();
        if !self.nodes.contains(&root) {
            return distances;
        }
        let mut queue = VecDeque::from([root]);
        distances.insert(root, 0);
        while let Some(node) = queue.pop_front() {
            let next = distances[&node] + 1;
            for link in self.incident.get(&node).into_iter().flatten() {
                if !distances.contains_key(&link.remote) {
                    distances.insert(link.remote, next);
                    queue.push_back(link.remote);
                }
            }
        }
        distances
    }

    /// Whether every node is reachable from every other node.
    pub fn is_connected(&self) -> bool {
        match self.nodes.first() {
            Some(first) => self.hop_distances(*first).len() == self.nodes.len(),
            None => false,
        }
    }
}

impl Topology for StaticTopology {
    fn nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().copied().collect()
    }

    fn raw_links(&self, node: NodeId) -> Vec<RawLink> {
        self.incident.get(&node).cloned().unwrap_or_default()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}

/// The deduplicated neighbor set of one node.
///
/// Built once at bootstrap and never mutated afterward. Maps every neighbor
/// to the single live link that reaches it; parallel links to an already
/// seen neighbor are recorded as disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRegistry {
    local: NodeId,
    neighbors: IndexMap<NodeId, LinkId>,
    disabled: Vec<LinkId>,
}

impl NeighborRegistry {
    /// Deduplicate a node's raw link list.
    ///
    /// The first link to each remote node is kept, every later link to the
    /// same remote node is disabled.
    pub fn from_links(
        local: NodeId,
        links: impl IntoIterator<Item = RawLink>,
    ) -> Result<Self, TopologyError> {
        let mut neighbors = IndexMap::new();
        let mut disabled = Vec::new();
        for link in links {
            if link.remote == local {
                return Err(TopologyError::SelfLoop {
                    node: local,
                    link: link.id,
                });
            }
            if neighbors.contains_key(&link.remote) {
                disabled.push(link.id);
            } else {
                neighbors.insert(link.remote, link.id);
            }
        }
        Ok(Self {
            local,
            neighbors,
            disabled,
        })
    }

    /// Registry with one synthetic link per neighbor.
    pub fn from_neighbors(
        local: NodeId,
        neighbors: impl IntoIterator<Item = NodeId>,
    ) -> Result<Self, TopologyError> {
        let links = neighbors
            .into_iter()
            .enumerate()
            .map(|(i, remote)| RawLink {
                id: LinkId(i as u32),
                remote,
            });
        Self::from_links(local, links)
    }

    /// The node this registry belongs to.
    pub fn local(&self) -> NodeId {
        self.local
    }

    /// Whether `node` is a registered neighbor.
    pub fn contains(&self, node: NodeId) -> bool {
        self.neighbors.contains_key(&node)
    }

    /// The live link reaching `node`.
    pub fn link_to(&self, node: NodeId) -> Option<LinkId> {
        self.neighbors.get(&node).copied()
    }

    /// Registered neighbors in link declaration order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbors.keys().copied()
    }

    /// Links disabled as duplicates.
    pub fn disabled_links(&self) -> &[LinkId] {
        &self.disabled
    }

    /// Number of registered neighbors.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether the node has no neighbors.
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

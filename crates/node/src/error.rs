//! Protocol state invariant violations.

use bfstree_types::{Layer, NodeId};
use thiserror::Error;

/// A broken invariant of a node's protocol state.
///
/// The handlers never produce one of these; `check_invariants` exists so
/// tests and runners can assert that after every step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The root picked up a parent or left layer 0.
    #[error("root {node} drifted: layer {layer}, parent {parent:?}")]
    RootDrifted {
        node: NodeId,
        layer: Layer,
        parent: Option<NodeId>,
    },

    /// A non-root node has a finite layer without a parent, or the reverse.
    #[error("{node} has layer {layer} but parent {parent:?}")]
    LayerParentMismatch {
        node: NodeId,
        layer: Layer,
        parent: Option<NodeId>,
    },

    /// The parent also sits in the children or other set.
    #[error("{node}: parent {parent} is also in {set}")]
    ParentClassifiedTwice {
        node: NodeId,
        parent: NodeId,
        set: &'static str,
    },

    /// A peer is both a child and an other link.
    #[error("{node}: {peer} is in both children and other")]
    ChildAndOther { node: NodeId, peer: NodeId },

    /// A peer outside the neighbor registry got classified.
    #[error("{node}: {peer} is classified but not a registered neighbor")]
    UnregisteredPeer { node: NodeId, peer: NodeId },
}

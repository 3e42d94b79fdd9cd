//! Outbound actions.

use crate::OutboundMessage;
use bfstree_types::{Layer, NodeId};

/// Actions a state machine asks its runner to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Hand a message to the delivery substrate. Fire-and-forget.
    Send {
        to: NodeId,
        message: OutboundMessage,
    },

    /// The node adopted a new parent.
    ///
    /// Purely informational: runners may log or count it, but it never
    /// turns into traffic.
    Reparented {
        previous: Option<NodeId>,
        parent: NodeId,
        layer: Layer,
    },
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Send { message, .. } => message.type_name(),
            Action::Reparented { .. } => "Reparented",
        }
    }
}

//! Inbound events.

use bfstree_messages::Probe;
use bfstree_types::NodeId;

/// Everything that can happen to a node.
///
/// `from` is never taken from a message payload. The delivery substrate
/// fills it in from the link the message arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Scheduled wake-up of the root. The only spontaneous event.
    SelfTrigger,

    /// A neighbor offers a candidate layer.
    ProbeReceived { from: NodeId, probe: Probe },

    /// A neighbor accepted one of our probes.
    AcknowledgeReceived { from: NodeId },

    /// A neighbor rejected one of our probes.
    RejectReceived { from: NodeId },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::SelfTrigger => "SelfTrigger",
            Event::ProbeReceived { .. } => "ProbeReceived",
            Event::AcknowledgeReceived { .. } => "AcknowledgeReceived",
            Event::RejectReceived { .. } => "RejectReceived",
        }
    }
}

//! Outbound message types for neighbor communication.

use crate::Event;
use bfstree_messages::{Acknowledge, Probe, ProtocolMessage, Reject};
use bfstree_types::NodeId;

/// Messages a node can send to a neighbor.
///
/// The runner handles the actual delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Candidate layer offer.
    Probe(Probe),

    /// Probe accepted.
    Acknowledge(Acknowledge),

    /// Probe rejected.
    Reject(Reject),
}

impl OutboundMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::Probe(_) => Probe::message_type_id(),
            OutboundMessage::Acknowledge(_) => Acknowledge::message_type_id(),
            OutboundMessage::Reject(_) => Reject::message_type_id(),
        }
    }

    /// Turn a delivered message into the event the receiver handles.
    ///
    /// `from` is the sending end of the link the message travelled over.
    pub fn into_event(self, from: NodeId) -> Event {
        match self {
            OutboundMessage::Probe(probe) => Event::ProbeReceived { from, probe },
            OutboundMessage::Acknowledge(_) => Event::AcknowledgeReceived { from },
            OutboundMessage::Reject(_) => Event::RejectReceived { from },
        }
    }
}

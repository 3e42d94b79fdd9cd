//! Probe message.

use crate::ProtocolMessage;
use bfstree_types::Layer;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Offers the receiver a candidate layer, inviting it to adopt the sender
/// as parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// Candidate layer: the sender's layer plus one.
    pub layer: Layer,

    /// Sender's logical time when the probe was created. Informational only.
    pub sent_at: Duration,
}

impl Probe {
    /// Create a new probe.
    pub fn new(layer: Layer, sent_at: Duration) -> Self {
        Self { layer, sent_at }
    }
}

impl ProtocolMessage for Probe {
    fn message_type_id() -> &'static str {
        "tree.probe"
    }
}

//! Acknowledge message.

use crate::ProtocolMessage;
use serde::{Deserialize, Serialize};

/// Sent back by a node that just accepted a probe: the receiver gains a child.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledge;

impl ProtocolMessage for Acknowledge {
    fn message_type_id() -> &'static str {
        "tree.acknowledge"
    }
}

//! Reject message.

use crate::ProtocolMessage;
use serde::{Deserialize, Serialize};

/// Sent back by a node whose layer was already no worse than the offered
/// candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reject;

impl ProtocolMessage for Reject {
    fn message_type_id() -> &'static str {
        "tree.reject"
    }
}

//! Messages exchanged between neighboring nodes.
//!
//! There are exactly three kinds. None of them names its sender: the sender
//! is implied by the link a message arrives on and is filled in by whatever
//! delivers it.

mod acknowledge;
mod probe;
mod reject;

pub use acknowledge::Acknowledge;
pub use probe::Probe;
pub use reject::Reject;

/// A message kind that travels over a neighbor link.
pub trait ProtocolMessage {
    /// Stable identifier for logs and statistics.
    fn message_type_id() -> &'static str;
}

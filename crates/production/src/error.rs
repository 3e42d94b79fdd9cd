//! Runtime errors.

use bfstree_types::{NodeId, TopologyError};
use thiserror::Error;

/// Errors from driving the actor runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("actor for {0} is no longer running")]
    ActorGone(NodeId),

    #[error("not quiescent after timeout, {in_flight} messages still in flight")]
    QuiescenceTimeout { in_flight: usize },

    #[error("actor task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

//! Actor runtime for the layered spanning tree protocol.
//!
//! Each node runs as its own tokio task that owns a [`NodeStateMachine`] and
//! drains an unbounded mailbox. Outbound messages leave over a [`LinkSender`]
//! which stamps the sender identity and delays delivery by a random duration,
//! so messages on one link may overtake each other.
//!
//! ```text
//!                  ┌──────────────┐   LinkSender    ┌──────────────┐
//!  SelfTrigger ──► │  NodeActor 0 │ ──(sleep, tx)──►│  NodeActor 1 │
//!                  └──────┬───────┘                 └──────┬───────┘
//!                         │ done()                         │ done()
//!                         ▼                                ▼
//!                  ┌──────────────────────────────────────────────┐
//!                  │ InFlight (atomic counter + Notify)           │
//!                  └──────────────────────────────────────────────┘
//!                                       ▲
//!                         ActorRuntime::wait_quiescent()
//! ```
//!
//! Quiescence is observed from outside the protocol: the counter goes up
//! before a message leaves and down once the receiving handler has returned.
//!
//! [`NodeStateMachine`]: bfstree_node::NodeStateMachine

mod actor;
mod config;
mod error;
mod link;
mod runtime;

pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use link::{InFlight, LinkSender};
pub use runtime::{ActorRuntime, RuntimeStats};

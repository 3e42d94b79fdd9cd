//! Per-node protocol engine.
//!
//! Each node runs the same four handlers against its own private state:
//!
//! - `Event::SelfTrigger` → the root offers layer 1 to every neighbor
//! - `Event::ProbeReceived` → accept a strictly smaller layer (adopt the
//!   sender as parent, acknowledge, re-broadcast) or reject it
//! - `Event::AcknowledgeReceived` → the sender becomes a child
//! - `Event::RejectReceived` → the sender is a non-tree link
//!
//! All delivery is performed by the runner via returned `Action`s.

mod bootstrap;
mod error;
mod report;
mod state;

pub use bootstrap::{bootstrap, BootstrapConfig, Bootstrapped};
pub use error::InvariantViolation;
pub use report::NodeReport;
pub use state::{Classification, NodeStateMachine};

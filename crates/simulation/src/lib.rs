//! Deterministic simulation runner.
//!
//! Runs every node of the graph in one thread, delivering messages in the
//! order a seeded latency model dictates. One seed, one history.
//!
//! # Flow
//!
//! ```text
//!   EventQueue ── pop (time, priority, node, seq) ──► NodeStateMachine::handle
//!       ▲                                                   │
//!       │                                                   ▼
//!       └──── push(delivery time) ◄── SimulatedNetwork ◄── Action::Send
//! ```
//!
//! The runner never decides when the protocol is "done". It simply runs out
//! of events; an empty queue is the quiescence an external observer waits
//! for before reading [`NodeReport`](bfstree_node::NodeReport)s.

mod event_queue;
mod network;
mod runner;

pub use bfstree_node::BootstrapConfig;
pub use event_queue::{EventKey, EventPriority};
pub use network::{LinkOrdering, NetworkConfig, SimulatedNetwork};
pub use runner::{SimulationRunner, SimulationStats};

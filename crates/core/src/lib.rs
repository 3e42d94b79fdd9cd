//! Core abstractions shared by the protocol engine and its runners.
//!
//! A node is a [`StateMachine`]: the runner feeds it [`Event`]s one at a
//! time and carries out the [`Action`]s it returns. The runner owns every
//! bit of I/O, scheduling and delivery; the state machine owns the
//! protocol state.

mod action;
mod event;
mod message;
mod traits;

pub use action::Action;
pub use event::Event;
pub use message::OutboundMessage;
pub use traits::StateMachine;

//! The node abstraction every runner drives.

use crate::{Action, Event};
use std::time::Duration;

/// One protocol participant, reduced to a transition function.
///
/// A runner hands events to a node one at a time and performs the returned
/// actions itself. Implementations never await, never touch the outside
/// world, and return the same actions for the same state and event, which
/// is what makes a seeded simulation replayable.
///
/// Calls for one node must not overlap: each `handle` runs to completion
/// before the next event for that node is delivered.
pub trait StateMachine {
    /// Apply `event` and return the messages and notifications it produced.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Advance the node's clock. Runners call this before every `handle`.
    fn set_time(&mut self, now: Duration);

    /// Clock value from the last `set_time`.
    fn now(&self) -> Duration;
}

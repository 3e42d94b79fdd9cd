//! Ordered event queue.

use bfstree_core::Event;
use bfstree_types::NodeId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Tie-break between events due at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    /// Scheduled wake-ups run before deliveries due at the same time.
    Timer = 0,
    /// Message deliveries.
    Network = 1,
}

/// Total order over scheduled events.
///
/// `sequence` is unique and increases with every push, so two events for
/// the same node at the same time run in the order they were scheduled.
/// FIFO links rely on that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub time: Duration,
    pub priority: EventPriority,
    pub node: NodeId,
    pub sequence: u64,
}

#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    events: BTreeMap<EventKey, Event>,
    next_sequence: u64,
}

impl EventQueue {
    pub(crate) fn push(
        &mut self,
        time: Duration,
        priority: EventPriority,
        node: NodeId,
        event: Event,
    ) -> EventKey {
        let key = EventKey {
            time,
            priority,
            node,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.events.insert(key, event);
        key
    }

    pub(crate) fn pop(&mut self) -> Option<(EventKey, Event)> {
        self.events.pop_first()
    }

    pub(crate) fn peek_time(&self) -> Option<Duration> {
        self.events.first_key_value().map(|(key, _)| key.time)
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

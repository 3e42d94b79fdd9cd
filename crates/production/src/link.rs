//! Mailboxes, links and the in-flight counter.

use bfstree_core::{Event, OutboundMessage};
use bfstree_node::NodeReport;
use bfstree_types::NodeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::trace;

/// What an actor's mailbox carries.
#[derive(Debug)]
pub(crate) enum Inbox {
    /// A protocol event. Counted in [`InFlight`] until handled.
    Deliver(Event),

    /// Reply with the node's current report.
    Snapshot(oneshot::Sender<NodeReport>),

    /// Stop the actor.
    Shutdown,
}

/// Counts protocol events that have been emitted but not yet handled.
///
/// Incremented before a message leaves its sender and decremented after the
/// receiving handler returns, so a zero count means no message can still
/// cause a state change.
#[derive(Clone, Debug, Default)]
pub struct InFlight {
    count: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages currently in flight.
    pub fn get(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn start(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn done(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Resolve once the count is zero.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before reading the count so a concurrent done() is not missed
            notified.as_mut().enable();
            if self.get() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// The sending end of one link, owned by the node at `from`.
///
/// The receiver learns who sent a message from the link it arrived on, so
/// the sender identity is stamped here rather than carried in payloads.
#[derive(Clone, Debug)]
pub struct LinkSender {
    from: NodeId,
    to: NodeId,
    tx: mpsc::UnboundedSender<Inbox>,
    in_flight: InFlight,
}

impl LinkSender {
    pub(crate) fn new(
        from: NodeId,
        to: NodeId,
        tx: mpsc::UnboundedSender<Inbox>,
        in_flight: InFlight,
    ) -> Self {
        Self {
            from,
            to,
            tx,
            in_flight,
        }
    }

    /// Deliver `message` after `delay`. Never blocks the caller.
    pub(crate) fn send(&self, message: OutboundMessage, delay: Duration) {
        self.in_flight.start();
        let event = message.into_event(self.from);
        let (from, to) = (self.from, self.to);
        let tx = self.tx.clone();
        let in_flight = self.in_flight.clone();

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            trace!(from = %from, to = %to, event = event.type_name(), "Delivering");
            if tx.send(Inbox::Deliver(event)).is_err() {
                // Receiver stopped; the message will never be handled
                in_flight.done();
            }
        });
    }
}

//! One node as a tokio task.

use crate::link::{InFlight, Inbox, LinkSender};
use crate::runtime::RuntimeStats;
use bfstree_core::{Action, Event, StateMachine};
use bfstree_node::NodeStateMachine;
use bfstree_types::NodeId;
use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

pub(crate) struct NodeActor {
    state: NodeStateMachine,
    inbox: mpsc::UnboundedReceiver<Inbox>,
    links: HashMap<NodeId, LinkSender>,
    in_flight: InFlight,
    stats: Arc<Mutex<RuntimeStats>>,
    rng: ChaCha8Rng,
    min_delay: Duration,
    max_delay: Duration,
    started: Instant,
}

impl NodeActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: NodeStateMachine,
        inbox: mpsc::UnboundedReceiver<Inbox>,
        links: HashMap<NodeId, LinkSender>,
        in_flight: InFlight,
        stats: Arc<Mutex<RuntimeStats>>,
        rng: ChaCha8Rng,
        delay: (Duration, Duration),
        started: Instant,
    ) -> Self {
        Self {
            state,
            inbox,
            links,
            in_flight,
            stats,
            rng,
            min_delay: delay.0,
            max_delay: delay.1,
            started,
        }
    }

    /// Drain the mailbox until shutdown or until every sender is gone.
    pub(crate) async fn run(mut self) {
        let id = self.state.id();
        debug!(node = %id, links = self.links.len(), "Actor started");

        while let Some(message) = self.inbox.recv().await {
            match message {
                Inbox::Deliver(event) => {
                    self.handle(event);
                    self.in_flight.done();
                }
                Inbox::Snapshot(reply) => {
                    // Requester may have given up
                    let _ = reply.send(self.state.report());
                }
                Inbox::Shutdown => break,
            }
        }

        debug!(node = %id, "Actor stopped");
    }

    fn handle(&mut self, event: Event) {
        self.state.set_time(self.started.elapsed());
        for action in self.state.handle(event) {
            match action {
                Action::Send { to, message } => {
                    if !self.links.contains_key(&to) {
                        warn!(from = %self.state.id(), to = %to, "No link to peer, message dropped");
                        continue;
                    }
                    let delay = self.sample_delay();
                    let link = &self.links[&to];
                    link.send(message, delay);
                    *self
                        .stats
                        .lock()
                        .messages_sent
                        .entry(message.type_name())
                        .or_default() += 1;
                }
                Action::Reparented { .. } => {
                    self.stats.lock().reparents += 1;
                }
            }
        }
    }

    fn sample_delay(&mut self) -> Duration {
        if self.max_delay.is_zero() {
            return Duration::ZERO;
        }
        let min = self.min_delay.as_micros() as u64;
        let max = self.max_delay.as_micros() as u64;
        Duration::from_micros(self.rng.gen_range(min..=max))
    }
}

//! Spawning, observing and stopping the actors.

use crate::actor::NodeActor;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::link::{InFlight, Inbox, LinkSender};
use bfstree_core::Event;
use bfstree_node::{bootstrap, BootstrapConfig, Bootstrapped, NodeReport};
use bfstree_types::{LinkId, NodeId, Topology};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Counters shared by every actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Messages sent, by message type.
    pub messages_sent: BTreeMap<&'static str, u64>,

    /// Parent changes announced by nodes.
    pub reparents: u64,
}

impl RuntimeStats {
    pub fn sent(&self, type_name: &str) -> u64 {
        self.messages_sent.get(type_name).copied().unwrap_or(0)
    }

    pub fn total_messages(&self) -> u64 {
        self.messages_sent.values().sum()
    }
}

/// A running graph of node actors.
///
/// Dropping the runtime asks every actor to stop without waiting for it.
pub struct ActorRuntime {
    mailboxes: BTreeMap<NodeId, mpsc::UnboundedSender<Inbox>>,
    tasks: Vec<(NodeId, JoinHandle<()>)>,
    in_flight: InFlight,
    stats: Arc<Mutex<RuntimeStats>>,
    root: NodeId,
    disabled_links: Vec<LinkId>,
    quiescence_timeout: Duration,
}

impl ActorRuntime {
    /// Bootstrap every node, spawn one task per node and schedule the root's
    /// self-trigger `trigger_at` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T: Topology + ?Sized>(
        topology: &T,
        bootstrap_config: BootstrapConfig,
        config: RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        let Bootstrapped {
            nodes,
            disabled_links,
        } = bootstrap(topology, &bootstrap_config)?;

        let in_flight = InFlight::new();
        let stats = Arc::new(Mutex::new(RuntimeStats::default()));
        let started = Instant::now();

        let mut mailboxes = BTreeMap::new();
        let mut pending = Vec::with_capacity(nodes.len());
        for (id, state) in nodes {
            let (tx, rx) = mpsc::unbounded_channel();
            mailboxes.insert(id, tx);
            pending.push((id, state, rx));
        }

        let mut tasks = Vec::with_capacity(pending.len());
        for (id, state, inbox) in pending {
            let links: HashMap<NodeId, LinkSender> = state
                .registry()
                .iter()
                .filter_map(|peer| {
                    mailboxes.get(&peer).map(|tx| {
                        (peer, LinkSender::new(id, peer, tx.clone(), in_flight.clone()))
                    })
                })
                .collect();
            let rng = ChaCha8Rng::seed_from_u64(config.seed ^ id.as_u64().rotate_left(32));
            let actor = NodeActor::new(
                state,
                inbox,
                links,
                in_flight.clone(),
                stats.clone(),
                rng,
                (config.min_delay, config.max_delay),
                started,
            );
            tasks.push((id, tokio::spawn(actor.run())));
        }

        let runtime = Self {
            mailboxes,
            tasks,
            in_flight,
            stats,
            root: bootstrap_config.root,
            disabled_links,
            quiescence_timeout: config.quiescence_timeout,
        };
        runtime.schedule_self_trigger(bootstrap_config.trigger_at)?;

        info!(
            nodes = runtime.mailboxes.len(),
            root = %runtime.root,
            disabled_links = runtime.disabled_links.len(),
            "Actor runtime started"
        );
        Ok(runtime)
    }

    fn schedule_self_trigger(&self, after: Duration) -> Result<(), RuntimeError> {
        let tx = self
            .mailboxes
            .get(&self.root)
            .cloned()
            .ok_or(RuntimeError::ActorGone(self.root))?;
        let in_flight = self.in_flight.clone();
        let root = self.root;

        // Counted from now so quiescence cannot be observed before the trigger
        in_flight.start();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            debug!(node = %root, "Self-trigger");
            if tx.send(Inbox::Deliver(Event::SelfTrigger)).is_err() {
                in_flight.done();
            }
        });
        Ok(())
    }

    /// Wait until no message is in flight.
    pub async fn wait_quiescent(&self) -> Result<(), RuntimeError> {
        match tokio::time::timeout(self.quiescence_timeout, self.in_flight.wait_idle()).await {
            Ok(()) => {
                debug!(stats = ?self.stats(), "Quiescent");
                Ok(())
            }
            Err(_) => Err(RuntimeError::QuiescenceTimeout {
                in_flight: self.in_flight.get(),
            }),
        }
    }

    /// Every node's report, in id order.
    pub async fn snapshot(&self) -> Result<Vec<NodeReport>, RuntimeError> {
        let mut reports = Vec::with_capacity(self.mailboxes.len());
        for (id, tx) in &self.mailboxes {
            let (reply, rx) = oneshot::channel();
            tx.send(Inbox::Snapshot(reply))
                .map_err(|_| RuntimeError::ActorGone(*id))?;
            reports.push(rx.await.map_err(|_| RuntimeError::ActorGone(*id))?);
        }
        Ok(reports)
    }

    pub fn stats(&self) -> RuntimeStats {
        self.stats.lock().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn disabled_links(&self) -> &[LinkId] {
        &self.disabled_links
    }

    /// Stop every actor and wait for its task to finish.
    pub async fn shutdown(mut self) -> Result<(), RuntimeError> {
        for tx in self.mailboxes.values() {
            let _ = tx.send(Inbox::Shutdown);
        }
        for (id, task) in std::mem::take(&mut self.tasks) {
            task.await?;
            debug!(node = %id, "Actor joined");
        }
        Ok(())
    }

    /// Spawn, wait for quiescence, collect reports and shut down.
    pub async fn run<T: Topology + ?Sized>(
        topology: &T,
        bootstrap_config: BootstrapConfig,
        config: RuntimeConfig,
    ) -> Result<(Vec<NodeReport>, RuntimeStats), RuntimeError> {
        let runtime = Self::spawn(topology, bootstrap_config, config)?;
        runtime.wait_quiescent().await?;
        let reports = runtime.snapshot().await?;
        let stats = runtime.stats();
        runtime.shutdown().await?;
        Ok((reports, stats))
    }
}

impl Drop for ActorRuntime {
    fn drop(&mut self) {
        for tx in self.mailboxes.values() {
            let _ = tx.send(Inbox::Shutdown);
        }
    }
}

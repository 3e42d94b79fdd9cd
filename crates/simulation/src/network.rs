//! Simulated links: latency sampling and per-link ordering.

use bfstree_types::NodeId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::time::Duration;

/// Ordering guarantee of a directed link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkOrdering {
    /// Every message gets an independent delay and may overtake earlier ones.
    #[default]
    Unordered,

    /// Messages on one directed link arrive in the order they were sent.
    Fifo,
}

/// Configuration for the simulated network.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    /// Whether messages are delayed at all. When false, every message is
    /// delivered at the instant it was sent.
    pub delayed: bool,

    /// Lower bound of the uniformly sampled per-message latency.
    pub min_latency: Duration,

    /// Upper bound (inclusive) of the per-message latency.
    pub max_latency: Duration,

    /// Per-link ordering guarantee.
    pub ordering: LinkOrdering,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            delayed: true,
            min_latency: Duration::from_millis(1),
            max_latency: Duration::from_millis(1000),
            ordering: LinkOrdering::Unordered,
        }
    }
}

impl NetworkConfig {
    /// Zero-delay delivery.
    pub fn immediate() -> Self {
        Self {
            delayed: false,
            ..Default::default()
        }
    }

    /// Set the latency bounds.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min;
        self.max_latency = max.max(min);
        self
    }

    /// Set the per-link ordering.
    pub fn with_ordering(mut self, ordering: LinkOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Keep every directed link in send order.
    pub fn fifo(self) -> Self {
        self.with_ordering(LinkOrdering::Fifo)
    }
}

/// Assigns delivery times to messages.
pub struct SimulatedNetwork {
    config: NetworkConfig,
    rng: ChaCha8Rng,
    /// Latest delivery time handed out per directed link (FIFO only).
    last_delivery: HashMap<(NodeId, NodeId), Duration>,
}

impl SimulatedNetwork {
    /// Create a network seeded for deterministic latencies.
    pub fn new(config: NetworkConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_delivery: HashMap::new(),
        }
    }

    /// Sample a latency for one message.
    pub fn sample_latency(&mut self) -> Duration {
        if !self.config.delayed {
            return Duration::ZERO;
        }
        let min = self.config.min_latency.as_nanos() as u64;
        let max = self.config.max_latency.as_nanos() as u64;
        if max <= min {
            return self.config.min_latency;
        }
        Duration::from_nanos(self.rng.gen_range(min..=max))
    }

    /// When a message sent now from `from` to `to` arrives.
    pub fn delivery_time(&mut self, from: NodeId, to: NodeId, now: Duration) -> Duration {
        let at = now + self.sample_latency();
        match self.config.ordering {
            LinkOrdering::Unordered => at,
            LinkOrdering::Fifo => {
                let last = self.last_delivery.entry((from, to)).or_default();
                *last = at.max(*last);
                *last
            }
        }
    }
}

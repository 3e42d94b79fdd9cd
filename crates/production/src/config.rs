//! Runtime configuration.

use std::time::Duration;

/// Configuration for [`ActorRuntime`](crate::ActorRuntime).
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Lower bound of the per-message delivery delay.
    pub min_delay: Duration,

    /// Upper bound of the per-message delivery delay, inclusive.
    pub max_delay: Duration,

    /// How long [`wait_quiescent`](crate::ActorRuntime::wait_quiescent)
    /// waits before giving up.
    pub quiescence_timeout: Duration,

    /// Seed for the per-node delay generators.
    pub seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::from_millis(5),
            quiescence_timeout: Duration::from_secs(30),
            seed: 0,
        }
    }
}

impl RuntimeConfig {
    /// Set the delay range. `max` is clamped up to `min`.
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max.max(min);
        self
    }

    pub fn with_quiescence_timeout(mut self, timeout: Duration) -> Self {
        self.quiescence_timeout = timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

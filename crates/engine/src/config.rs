//! Engine configuration shared across the orchestrator and worker.

use std::time::Duration;

/// Timing knobs for the validation worker and the idle-wait protocol.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long the worker sleeps between ticks while no dirty signal is
    /// pending.
    pub idle_poll: Duration,
    /// Back-off after a failed pass. Shorter than the idle poll so transient
    /// races self-heal quickly.
    pub retry_backoff: Duration,
    /// Poll interval used by `wait_until_idle`.
    pub wait_poll: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_poll: Duration::from_millis(500),
            retry_backoff: Duration::from_millis(200),
            wait_poll: Duration::from_millis(10),
        }
    }
}

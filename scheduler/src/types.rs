//! Scheduler configuration.

use std::time::Duration;

/// Timing and retry-budget knobs for the queue scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Cadence of the dispatch tick. Ticks never overlap; a tick still
    /// running when the next fires causes the next to be skipped.
    pub tick_interval: Duration,

    /// Maximum number of dispatch attempts per withdrawal before it goes
    /// terminal. An item is `Failed` exactly when its retry count reaches
    /// this value.
    pub max_retries: u32,

    /// Fixed delay applied before a failed withdrawal is re-armed.
    /// Flat, not exponential.
    pub retry_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            max_retries: 3,
            retry_delay_ms: 5 * 60 * 1_000,
        }
    }
}

//! Decides what happens to a withdrawal after a failed or indeterminate
//! dispatch attempt.
//
//  This module is deliberately pure: no async, no IO.

use crate::types::SchedulerConfig;

/// Outcome of charging one attempt against the retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Budget remains: re-arm as `Pending` at `scheduled_at_ms`.
    Rearm { retry_count: u32, scheduled_at_ms: u64 },
    /// Budget spent: the item goes terminal `Failed` and is never re-armed.
    Exhausted { retry_count: u32 },
}

/// Charge one failed attempt. The retry count is clamped so it never exceeds
/// `max_retries`, and the item is exhausted exactly when it reaches it.
pub fn after_failure(retry_count: u32, cfg: &SchedulerConfig, now_ms: u64) -> RetryDecision {
    let charged = retry_count.saturating_add(1).min(cfg.max_retries);

    if charged >= cfg.max_retries {
        RetryDecision::Exhausted {
            retry_count: charged,
        }
    } else {
        RetryDecision::Rearm {
            retry_count: charged,
            scheduled_at_ms: now_ms + cfg.retry_delay_ms,
        }
    }
}

/// Charge an indeterminate attempt found at restart. An item left in
/// `Processing` has unknown outcome; it is re-queued as due immediately
/// rather than delayed, unless the charge exhausts the budget.
pub fn after_indeterminate(retry_count: u32, cfg: &SchedulerConfig) -> RetryDecision {
    let charged = retry_count.saturating_add(1).min(cfg.max_retries);

    if charged >= cfg.max_retries {
        RetryDecision::Exhausted {
            retry_count: charged,
        }
    } else {
        RetryDecision::Rearm {
            retry_count: charged,
            scheduled_at_ms: 0,
        }
    }
}

//! The queue scheduler engine.
//!
//! On each tick it:
//!   1. Loads the pending-withdrawal queue from the store.
//!   2. Selects entries that are due (`Pending` with elapsed schedule).
//!   3. Marks each `Processing` before dispatching through the gateway.
//!   4. Applies the retry/backoff/dead-letter transition on the outcome.
//!
//! Safety properties:
//! - A crash mid-dispatch leaves the item visible as `Processing`;
//!   `recover()` re-queues it with a charged retry rather than assuming
//!   success, so restarts never duplicate a logical queue entry.
//! - Ticks are single-flight: an overlapping tick is skipped, not queued.
//! - Dispatch failures never propagate to callers; they are absorbed into
//!   the withdrawal's own state machine.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use gateway::ContractGateway;
use gateway::types::WithdrawalCall;
use ledger::model::{DeliveryStatus, PendingWithdrawal};
use ledger::store::LedgerStore;

use crate::retry::{self, RetryDecision};
use crate::types::SchedulerConfig;

pub struct QueueScheduler<S: LedgerStore> {
    cfg: SchedulerConfig,
    store: Arc<S>,
    gateway: Arc<dyn ContractGateway>,
    /// Single-flight guard: held for the duration of one tick.
    tick_guard: Mutex<()>,
}

impl<S: LedgerStore> QueueScheduler<S> {
    pub fn new(cfg: SchedulerConfig, store: Arc<S>, gateway: Arc<dyn ContractGateway>) -> Self {
        Self {
            cfg,
            store,
            gateway,
            tick_guard: Mutex::new(()),
        }
    }

    /// Roll back indeterminate entries left over from a previous process.
    ///
    /// Any entry found in `Processing` has unknown dispatch outcome. It is
    /// charged one retry and re-queued as immediately due, or marked
    /// terminal `Failed` if that charge exhausts the budget. Must run before
    /// the tick loop starts.
    pub async fn recover(&self) -> anyhow::Result<usize> {
        let withdrawals = self.store.load_withdrawals().await?;
        let mut recovered = 0;

        for mut w in withdrawals {
            if w.status != DeliveryStatus::Processing {
                continue;
            }

            match retry::after_indeterminate(w.retry_count, &self.cfg) {
                RetryDecision::Rearm { retry_count, .. } => {
                    w.retry_count = retry_count;
                    w.status = DeliveryStatus::Pending;
                    info!(
                        withdrawal_id = %w.id,
                        retry_count,
                        "indeterminate withdrawal re-queued after restart"
                    );
                }
                RetryDecision::Exhausted { retry_count } => {
                    w.retry_count = retry_count;
                    w.status = DeliveryStatus::Failed;
                    warn!(
                        withdrawal_id = %w.id,
                        "indeterminate withdrawal exhausted retry budget at restart"
                    );
                    self.record_failure(&w).await;
                }
            }

            self.store.save_withdrawal(&w).await?;
            recovered += 1;
        }

        Ok(recovered)
    }

    /// Executes one scheduling tick.
    ///
    /// Due entries are visited in queue-insertion order and dispatched
    /// sequentially; there is no cross-item ordering guarantee beyond that.
    /// Returns the number of entries dispatched this tick.
    #[instrument(skip(self), target = "scheduler", fields(now_ms))]
    pub async fn tick(&self, now_ms: u64) -> anyhow::Result<usize> {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            debug!("previous tick still running; skipping");
            return Ok(0);
        };

        let due: Vec<PendingWithdrawal> = self
            .store
            .load_withdrawals()
            .await?
            .into_iter()
            .filter(|w| w.is_due(now_ms))
            .collect();

        if due.is_empty() {
            return Ok(0);
        }

        debug!(due = due.len(), "dispatching due withdrawals");

        let mut dispatched = 0;
        for w in due {
            self.dispatch_one(w, now_ms).await?;
            dispatched += 1;
        }

        Ok(dispatched)
    }

    /// Dispatch a single due withdrawal and apply its state transition.
    ///
    /// Store failures propagate (nothing was sent if we could not persist
    /// the `Processing` guard first); gateway failures do not.
    async fn dispatch_one(&self, mut w: PendingWithdrawal, now_ms: u64) -> anyhow::Result<()> {
        // Idempotency guard: persist Processing before the send, so a crash
        // mid-dispatch is visible as indeterminate rather than re-pending.
        w.status = DeliveryStatus::Processing;
        self.store.save_withdrawal(&w).await?;

        let call = WithdrawalCall {
            deposit_id: w.deposit_id,
            recipient: w.recipient.clone(),
            amount: w.amount,
            fee_rate: w.fee_rate,
            delay_ms: w.delay_ms,
        };

        match self.gateway.submit_withdrawal(&call).await {
            Ok(reference) => {
                w.status = DeliveryStatus::Completed;
                self.store.save_withdrawal(&w).await?;

                info!(
                    withdrawal_id = %w.id,
                    deposit_id = w.deposit_id,
                    amount = w.amount,
                    retry_count = w.retry_count,
                    reference = %reference,
                    "withdrawal completed"
                );

                self.record_completion(&w, reference).await;
            }
            Err(e) => match retry::after_failure(w.retry_count, &self.cfg, now_ms) {
                RetryDecision::Rearm {
                    retry_count,
                    scheduled_at_ms,
                } => {
                    w.retry_count = retry_count;
                    w.scheduled_at_ms = scheduled_at_ms;
                    w.status = DeliveryStatus::Pending;
                    self.store.save_withdrawal(&w).await?;

                    warn!(
                        withdrawal_id = %w.id,
                        deposit_id = w.deposit_id,
                        retry_count,
                        error = %e,
                        "withdrawal dispatch failed; re-armed"
                    );
                }
                RetryDecision::Exhausted { retry_count } => {
                    w.retry_count = retry_count;
                    w.status = DeliveryStatus::Failed;
                    self.store.save_withdrawal(&w).await?;

                    warn!(
                        withdrawal_id = %w.id,
                        deposit_id = w.deposit_id,
                        error = %e,
                        "retry budget exhausted; withdrawal failed permanently"
                    );

                    self.record_failure(&w).await;
                }
            },
        }

        Ok(())
    }

    /// Reflect a completed withdrawal into the deposit's history record.
    ///
    /// The record flips to `Completed` only once no non-terminal withdrawal
    /// remains for the deposit; an already-`Failed` record stays failed.
    /// Best-effort: the ledger operation cannot be un-sent, so a history
    /// write failure is logged, never rolled back.
    async fn record_completion(&self, w: &PendingWithdrawal, reference: String) {
        if let Err(e) = self.try_record_completion(w, reference).await {
            warn!(
                deposit_id = w.deposit_id,
                error = %e,
                "failed to update mix history after completion"
            );
        }
    }

    async fn try_record_completion(
        &self,
        w: &PendingWithdrawal,
        reference: String,
    ) -> anyhow::Result<()> {
        let Some(mut record) = self.store.find_record(w.deposit_id).await? else {
            return Ok(());
        };

        record.ledger_reference = Some(reference);

        let open_remaining = self
            .store
            .load_withdrawals()
            .await?
            .iter()
            .any(|o| o.deposit_id == w.deposit_id && !o.is_terminal());

        if !open_remaining && record.status != DeliveryStatus::Failed {
            record.status = DeliveryStatus::Completed;
        }

        self.store.save_record(&record).await
    }

    /// Mark the deposit's history record failed. Best-effort, like
    /// completion updates.
    async fn record_failure(&self, w: &PendingWithdrawal) {
        let result: anyhow::Result<()> = async {
            if let Some(mut record) = self.store.find_record(w.deposit_id).await? {
                record.status = DeliveryStatus::Failed;
                self.store.save_record(&record).await?;
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!(
                deposit_id = w.deposit_id,
                error = %e,
                "failed to update mix history after terminal failure"
            );
        }
    }
}

//! Distribution planning: one batch call when the request fits the
//! contract's capacity, otherwise decomposition into independently
//! scheduled withdrawals.

use tracing::{info, warn};
use uuid::Uuid;

use catalog::Pool;
use gateway::ContractGateway;
use gateway::types::BatchEntry;
use ledger::model::{DeliveryStatus, Deposit, PendingWithdrawal};

use crate::error::MixError;

/// One requested payout leg of a distribution.
#[derive(Debug, Clone)]
pub struct RecipientRequest {
    pub recipient: String,
    pub amount: u64,
    /// Requested hold-back before delivery, at least the pool's minimum.
    pub delay_ms: u64,
}

/// Outcome of planning a distribution.
///
/// `Batched` means the whole distribution already settled through a single
/// gateway call and nothing enters the queue. `Decomposed` entries still
/// need to be persisted and picked up by the scheduler.
#[derive(Debug)]
pub enum DeliveryPlan {
    Batched { reference: String },
    Decomposed(Vec<PendingWithdrawal>),
}

/// Validate and plan one distribution request.
///
/// Validation covers every leg before either path runs; a rejected plan
/// creates nothing. `available` is the deposit's uncommitted remainder, so
/// repeated distributions against one deposit can never over-commit it in
/// total. The batch path is attempted once, synchronously, and only while
/// the recipient count fits `batch_capacity`. Any failure of that attempt
/// falls back to full decomposition.
///
/// The fallback assumes a failed batch applied nothing on the ledger. A
/// contract that partially applies batches would double-pay recipients
/// already settled; confirm its semantics before relying on the fallback.
pub async fn plan(
    gateway: &dyn ContractGateway,
    deposit: &Deposit,
    pool: &Pool,
    requests: &[RecipientRequest],
    batch_capacity: u32,
    available: u64,
    now_ms: u64,
) -> Result<DeliveryPlan, MixError> {
    validate(available, pool, requests, now_ms)?;

    if requests.len() <= batch_capacity as usize {
        let entries: Vec<BatchEntry> = requests
            .iter()
            .map(|r| BatchEntry {
                recipient: r.recipient.clone(),
                amount: r.amount,
                fee_rate: pool.fee_rate,
                delay_ms: r.delay_ms,
            })
            .collect();

        match gateway
            .submit_batch_withdrawal(deposit.deposit_id, &entries, batch_capacity)
            .await
        {
            Ok(reference) => {
                info!(
                    deposit_id = deposit.deposit_id,
                    recipients = requests.len(),
                    reference = %reference,
                    "distribution settled as a single batch"
                );
                return Ok(DeliveryPlan::Batched { reference });
            }
            Err(e) => {
                warn!(
                    deposit_id = deposit.deposit_id,
                    error = %e,
                    "batch dispatch failed; decomposing into individual withdrawals"
                );
            }
        }
    }

    Ok(DeliveryPlan::Decomposed(decompose(
        deposit, pool, requests, now_ms,
    )))
}

fn validate(
    available: u64,
    pool: &Pool,
    requests: &[RecipientRequest],
    now_ms: u64,
) -> Result<(), MixError> {
    if requests.is_empty() {
        return Err(MixError::PlanInvalid(
            "distribution needs at least one recipient".into(),
        ));
    }

    let mut total: u64 = 0;
    for r in requests {
        if r.amount == 0 {
            return Err(MixError::PlanInvalid(format!(
                "recipient {} has a zero amount",
                r.recipient
            )));
        }
        if r.delay_ms < pool.min_delay_ms {
            return Err(MixError::PlanInvalid(format!(
                "delay {}ms for recipient {} is below the pool minimum of {}ms",
                r.delay_ms, r.recipient, pool.min_delay_ms
            )));
        }
        if now_ms.checked_add(r.delay_ms).is_none() {
            return Err(MixError::PlanInvalid(format!(
                "delay {}ms for recipient {} is beyond the schedulable range",
                r.delay_ms, r.recipient
            )));
        }
        total = total.checked_add(r.amount).ok_or_else(|| {
            MixError::PlanInvalid("sum of recipient amounts overflows".into())
        })?;
    }

    if total > available {
        return Err(MixError::PlanInvalid(format!(
            "recipient amounts total {} but only {} of the deposit remains",
            total, available
        )));
    }

    Ok(())
}

/// One queue entry per recipient, each carrying its own schedule and a
/// planning-time snapshot of the pool's fee rate.
fn decompose(
    deposit: &Deposit,
    pool: &Pool,
    requests: &[RecipientRequest],
    now_ms: u64,
) -> Vec<PendingWithdrawal> {
    requests
        .iter()
        .map(|r| PendingWithdrawal {
            id: Uuid::new_v4(),
            deposit_id: deposit.deposit_id,
            recipient: r.recipient.clone(),
            amount: r.amount,
            scheduled_at_ms: now_ms + r.delay_ms,
            status: DeliveryStatus::Pending,
            retry_count: 0,
            pool_id: deposit.pool_id,
            fee_rate: pool.fee_rate,
            delay_ms: r.delay_ms,
            created_at_ms: now_ms,
        })
        .collect()
}

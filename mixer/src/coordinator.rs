//! Request-side façade: deposit creation and distribution scheduling.
//!
//! The coordinator owns nothing the scheduler needs at runtime; it writes
//! queue entries and history records through the shared store and keeps an
//! in-memory view of active deposits for planning lookups.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use catalog::PoolCatalog;
use common::time::now_ms;
use gateway::ContractGateway;
use gateway::types::{DepositId, PoolId};
use ledger::model::{DeliveryStatus, Deposit, MixRecord};
use ledger::store::LedgerStore;

use crate::error::MixError;
use crate::planner::{self, DeliveryPlan, RecipientRequest};

/// An open deposit together with the amount already committed to settled
/// batches or queued withdrawals. `committed` never exceeds the deposit
/// amount; the difference is what future distributions may still spend.
struct ActiveDeposit {
    deposit: Deposit,
    committed: u64,
}

pub struct MixCoordinator<S: LedgerStore> {
    store: Arc<S>,
    gateway: Arc<dyn ContractGateway>,
    catalog: Arc<PoolCatalog>,
    deposits: Mutex<HashMap<DepositId, ActiveDeposit>>,
}

impl<S: LedgerStore> MixCoordinator<S> {
    pub fn new(store: Arc<S>, gateway: Arc<dyn ContractGateway>, catalog: Arc<PoolCatalog>) -> Self {
        Self {
            store,
            gateway,
            catalog,
            deposits: Mutex::new(HashMap::new()),
        }
    }

    /// Open a mix by placing a deposit into the chosen pool.
    ///
    /// The deposit dispatch is at-most-once: a gateway failure here is
    /// surfaced to the caller with nothing committed, never retried. The
    /// `Pending` history record is written only after the ledger has
    /// assigned a deposit id.
    #[instrument(skip(self, note), target = "mixer")]
    pub async fn initiate_mix(
        &self,
        amount: u64,
        pool_id: PoolId,
        note: Option<String>,
    ) -> Result<Deposit, MixError> {
        let pool = self
            .catalog
            .get(pool_id)
            .await
            .ok_or(MixError::UnknownPool(pool_id))?;

        if amount == 0 || !pool.accepts_amount(amount) {
            return Err(MixError::InvalidAmount { pool_id, amount });
        }

        let deposit_id = self
            .gateway
            .submit_deposit(pool_id, amount)
            .await
            .map_err(MixError::from_gateway)?;

        let created_at_ms = now_ms();
        let deposit = Deposit {
            deposit_id,
            pool_id,
            amount,
            // Opaque local funding tag; the ledger only knows the deposit id.
            input_identity: Uuid::new_v4().to_string(),
            created_at_ms,
            status: DeliveryStatus::Pending,
        };

        let record = MixRecord {
            id: Uuid::new_v4(),
            deposit_id,
            amount,
            fee_rate: pool.fee_rate,
            status: DeliveryStatus::Pending,
            created_at_ms,
            ledger_reference: None,
            note,
        };
        self.store.save_record(&record).await?;

        info!(deposit_id, pool_id, amount, "mix initiated");

        self.deposits.lock().await.insert(
            deposit_id,
            ActiveDeposit {
                deposit: deposit.clone(),
                committed: 0,
            },
        );

        Ok(deposit)
    }

    /// Plan and commit the payout side of a deposit.
    ///
    /// All-or-nothing: a validation failure persists nothing, and a
    /// decomposed plan lands in the queue in a single store transaction.
    /// Each call validates against the deposit's uncommitted remainder, so
    /// repeated distributions can never spend more than the deposit holds.
    #[instrument(skip(self, recipients), target = "mixer", fields(recipients = recipients.len()))]
    pub async fn schedule_distribution(
        &self,
        deposit_id: DepositId,
        recipients: &[RecipientRequest],
    ) -> Result<(), MixError> {
        // Held for the whole call: two concurrent plans must not both
        // validate against the same remainder.
        let mut deposits = self.deposits.lock().await;
        let active = deposits
            .get_mut(&deposit_id)
            .ok_or_else(|| MixError::PlanInvalid(format!("no active deposit {deposit_id}")))?;

        let pool = self
            .catalog
            .get(active.deposit.pool_id)
            .await
            .ok_or(MixError::UnknownPool(active.deposit.pool_id))?;

        let capacity = self
            .catalog
            .batch_capacity()
            .await
            .map_err(MixError::from_gateway)?;

        let available = active.deposit.amount.saturating_sub(active.committed);

        let plan = planner::plan(
            self.gateway.as_ref(),
            &active.deposit,
            &pool,
            recipients,
            capacity,
            available,
            now_ms(),
        )
        .await?;

        // Cannot overflow: the plan validated this total against `available`.
        let total: u64 = recipients.iter().map(|r| r.amount).sum();

        match plan {
            DeliveryPlan::Batched { reference } => {
                active.committed += total;
                self.mark_batched(deposit_id, reference).await;
            }
            DeliveryPlan::Decomposed(withdrawals) => {
                self.store.save_withdrawals(&withdrawals).await?;
                active.committed += total;
                info!(
                    deposit_id,
                    count = withdrawals.len(),
                    "distribution queued for scheduling"
                );
            }
        }

        Ok(())
    }

    /// The durable audit trail, most recent first.
    pub async fn get_history(&self) -> Result<Vec<MixRecord>, MixError> {
        Ok(self.store.load_history().await?)
    }

    /// Purge the history. In-flight withdrawals are an independent
    /// lifecycle and are left untouched.
    pub async fn clear_history(&self) -> Result<(), MixError> {
        Ok(self.store.clear_history().await?)
    }

    /// A batched distribution already settled on the ledger, so the history
    /// update is best-effort: failure is logged, never rolled back.
    async fn mark_batched(&self, deposit_id: DepositId, reference: String) {
        let result: anyhow::Result<()> = async {
            if let Some(mut record) = self.store.find_record(deposit_id).await? {
                record.status = DeliveryStatus::Completed;
                record.ledger_reference = Some(reference);
                self.store.save_record(&record).await?;
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!(
                deposit_id,
                error = %e,
                "failed to update mix history after batch settlement"
            );
        }
    }
}

pub mod sqlite_store;

use gateway::types::DepositId;

use crate::model::{MixRecord, PendingWithdrawal};

/// Durable storage for the two engine collections: the pending-withdrawal
/// queue and the completed-mix history.
///
/// Mutation discipline: the queue is written by the planner (insertion) and
/// the scheduler (state transitions); the history is written by the
/// coordinator and the scheduler. Everything else reads snapshots.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// All queue entries in insertion order, terminal ones included.
    async fn load_withdrawals(&self) -> anyhow::Result<Vec<PendingWithdrawal>>;

    /// Upsert a single queue entry.
    async fn save_withdrawal(&self, withdrawal: &PendingWithdrawal) -> anyhow::Result<()>;

    /// Insert a set of queue entries atomically: either all land or none do.
    async fn save_withdrawals(&self, withdrawals: &[PendingWithdrawal]) -> anyhow::Result<()>;

    /// Full history, most recent first.
    async fn load_history(&self) -> anyhow::Result<Vec<MixRecord>>;

    /// Upsert a history record.
    async fn save_record(&self, record: &MixRecord) -> anyhow::Result<()>;

    /// The history record anchored to a deposit, if any.
    async fn find_record(&self, deposit_id: DepositId) -> anyhow::Result<Option<MixRecord>>;

    /// Purge the history wholesale. Queue entries are untouched.
    async fn clear_history(&self) -> anyhow::Result<()>;
}

use std::fmt;
use std::str::FromStr;

use gateway::types::{DepositId, PoolId};

pub type WithdrawalId = uuid::Uuid;
pub type RecordId = uuid::Uuid;

/// Lifecycle of a queue entry or history record.
///
/// Transitions only ever move forward: Pending → Processing → Completed or
/// Failed. The single backward edge is the explicit retry transition
/// Failed-attempt → Pending, applied by the scheduler while retry budget
/// remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Completed | DeliveryStatus::Failed)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeliveryStatus::Pending => "Pending",
            DeliveryStatus::Processing => "Processing",
            DeliveryStatus::Completed => "Completed",
            DeliveryStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

impl FromStr for DeliveryStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(DeliveryStatus::Pending),
            "Processing" => Ok(DeliveryStatus::Processing),
            "Completed" => Ok(DeliveryStatus::Completed),
            "Failed" => Ok(DeliveryStatus::Failed),
            other => Err(anyhow::anyhow!("Invalid DeliveryStatus value: {}", other)),
        }
    }
}

/// The funds-in operation anchoring a mix request to the ledger contract.
///
/// Write-once after creation; `status` is a best-effort mirror of the
/// ledger-side deposit state.
#[derive(Debug, Clone)]
pub struct Deposit {
    /// Assigned by the ledger, opaque.
    pub deposit_id: DepositId,
    pub pool_id: PoolId,
    pub amount: u64,
    pub input_identity: String,
    pub created_at_ms: u64,
    pub status: DeliveryStatus,
}

/// Durable, user-visible audit entry for one top-level mix operation.
///
/// Append-only; never deleted individually. The whole history may be cleared
/// by the user, which does not touch in-flight withdrawals.
#[derive(Debug, Clone)]
pub struct MixRecord {
    pub id: RecordId,
    pub deposit_id: DepositId,
    pub amount: u64,
    pub fee_rate: f64,
    pub status: DeliveryStatus,
    pub created_at_ms: u64,
    pub ledger_reference: Option<String>,
    pub note: Option<String>,
}

/// The unit the scheduler owns: a locally-scheduled, independently retried
/// funds-out operation.
///
/// Created by the planner, mutated only by the scheduler afterwards, and
/// retained after terminal failure for audit.
#[derive(Debug, Clone)]
pub struct PendingWithdrawal {
    /// Locally generated, unique.
    pub id: WithdrawalId,
    pub deposit_id: DepositId,
    pub recipient: String,
    pub amount: u64,
    /// Dispatch must not occur before this instant.
    pub scheduled_at_ms: u64,
    pub status: DeliveryStatus,
    pub retry_count: u32,
    pub pool_id: PoolId,
    /// Planning-time snapshot; never re-derived from pool data at dispatch.
    pub fee_rate: f64,
    /// Delay requested by the user, forwarded to the contract as-is.
    pub delay_ms: u64,
    pub created_at_ms: u64,
}

impl PendingWithdrawal {
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.status == DeliveryStatus::Pending && self.scheduled_at_ms <= now_ms
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

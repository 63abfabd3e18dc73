//! Shared types for gateway calls.

use serde::{Deserialize, Serialize};

/// Pool index inside the ledger contract.
pub type PoolId = u32;

/// Opaque integer identity assigned by the ledger when a deposit is accepted.
pub type DepositId = u64;

/// Pool parameters as stored by the contract.
///
/// Refreshed wholesale by the catalog; never partially mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolParameters {
    /// Rational fee in [0, 1). Encoded as parts-per-million on the wire.
    pub fee_rate: f64,
    pub min_amount: u64,
    pub max_amount: u64,
    pub min_delay_ms: u64,
}

/// One scheduled withdrawal dispatch.
///
/// `fee_rate` and `delay_ms` are planning-time snapshots carried with the
/// queue entry, not live pool lookups.
#[derive(Debug, Clone)]
pub struct WithdrawalCall {
    pub deposit_id: DepositId,
    pub recipient: String,
    pub amount: u64,
    pub fee_rate: f64,
    pub delay_ms: u64,
}

/// One recipient inside a batch withdrawal operation.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub recipient: String,
    pub amount: u64,
    pub fee_rate: f64,
    pub delay_ms: u64,
}

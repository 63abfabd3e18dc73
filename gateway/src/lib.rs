//! Narrow interface to the remote ledger contract.
//!
//! The engine never talks to the chain directly: everything goes through the
//! [`ContractGateway`] trait. The HTTP adapter in [`client`] is the only
//! production implementation; tests substitute in-memory mocks.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod types;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{BatchEntry, DepositId, PoolId, PoolParameters, WithdrawalCall};

/// Operations the engine needs from the ledger contract.
///
/// All remote failures collapse into [`GatewayError`]; callers treat network
/// failure and remote rejection the same way (retryable up to the same
/// budget). Idempotency of a retried submit is the gateway's problem, not
/// the caller's.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Read one pool's fee rate, amount bounds and minimum delay.
    async fn read_pool_parameters(&self, pool_id: PoolId)
    -> Result<PoolParameters, GatewayError>;

    /// Maximum number of recipients the contract accepts in one batch
    /// withdrawal operation.
    async fn read_batch_capacity(&self) -> Result<u32, GatewayError>;

    /// Submit a deposit and return the ledger-assigned deposit id.
    ///
    /// At-most-once per logical deposit attempt: the engine never auto-retries
    /// this call.
    async fn submit_deposit(&self, pool_id: PoolId, amount: u64)
    -> Result<DepositId, GatewayError>;

    /// Submit a single scheduled withdrawal. Returns an opaque ledger
    /// reference for the audit trail.
    async fn submit_withdrawal(&self, call: &WithdrawalCall) -> Result<String, GatewayError>;

    /// Submit one operation carrying every recipient. Fails fast (without a
    /// network round-trip) if `entries.len()` exceeds `max_batch_size`.
    async fn submit_batch_withdrawal(
        &self,
        deposit_id: DepositId,
        entries: &[BatchEntry],
        max_batch_size: u32,
    ) -> Result<String, GatewayError>;
}

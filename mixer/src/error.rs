use thiserror::Error;

use gateway::error::GatewayError;
use gateway::types::PoolId;

/// Request-facing error taxonomy.
///
/// Dispatch-time failures never appear here; once a withdrawal is queued its
/// failures are absorbed into its own state machine and observable only as
/// status.
#[derive(Debug, Error)]
pub enum MixError {
    #[error("amount {amount} is outside the bounds of pool {pool_id}")]
    InvalidAmount { pool_id: PoolId, amount: u64 },

    #[error("unknown pool {0}")]
    UnknownPool(PoolId),

    #[error("invalid distribution plan: {0}")]
    PlanInvalid(String),

    /// Missing contract address or network config. Fatal, never retried.
    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(&'static str),

    #[error("gateway error: {0}")]
    Gateway(GatewayError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl MixError {
    /// Splits configuration absence out of the generic gateway failure.
    pub fn from_gateway(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(what) => MixError::GatewayUnavailable(what),
            other => MixError::Gateway(other),
        }
    }
}

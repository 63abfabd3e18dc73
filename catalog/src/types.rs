use gateway::types::{PoolId, PoolParameters};

/// One mixing pool as advertised by the ledger contract.
///
/// Immutable per refresh: the catalog replaces the whole set, it never
/// patches individual fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    pub id: PoolId,
    /// Rational fee in [0, 1).
    pub fee_rate: f64,
    pub min_amount: u64,
    pub max_amount: u64,
    pub min_delay_ms: u64,
}

impl Pool {
    pub fn from_parameters(id: PoolId, params: PoolParameters) -> Self {
        Self {
            id,
            fee_rate: params.fee_rate,
            min_amount: params.min_amount,
            max_amount: params.max_amount,
            min_delay_ms: params.min_delay_ms,
        }
    }

    /// Deposit amounts must land inside [min_amount, max_amount].
    pub fn accepts_amount(&self, amount: u64) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Contract address / network selector missing. Fatal for the requested
    /// operation, never retried.
    #[error("gateway not configured: {0}")]
    Unavailable(&'static str),

    #[error("batch of {got} recipients exceeds contract capacity {max}")]
    BatchTooLarge { got: usize, max: u32 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("contract rejected operation: {0}")]
    Rejected(String),
}

//! Gateway configuration.
//!
//! Exactly two inputs are required before any contract operation can succeed:
//! the contract address and the network selector. Their absence is a fatal
//! configuration error surfaced as [`GatewayError::Unavailable`], never
//! retried.

use std::str::FromStr;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Base RPC endpoint for the selected network.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://rpc.tumbler.network",
            Network::Testnet => "https://testnet-rpc.tumbler.network",
        }
    }
}

impl FromStr for Network {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            _ => Err(GatewayError::Unavailable("unrecognized network selector")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub contract_address: String,
    pub network: Network,
}

impl GatewayConfig {
    pub fn new(contract_address: impl Into<String>, network: Network) -> Self {
        Self {
            contract_address: contract_address.into(),
            network,
        }
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        let contract_address = std::env::var("TUMBLER_CONTRACT_ADDRESS")
            .map_err(|_| GatewayError::Unavailable("TUMBLER_CONTRACT_ADDRESS not set"))?;

        if contract_address.is_empty() {
            return Err(GatewayError::Unavailable("TUMBLER_CONTRACT_ADDRESS empty"));
        }

        let network = std::env::var("TUMBLER_NETWORK")
            .map_err(|_| GatewayError::Unavailable("TUMBLER_NETWORK not set"))?
            .parse()?;

        Ok(Self {
            contract_address,
            network,
        })
    }
}

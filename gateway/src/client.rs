//! HTTP adapter for the ledger contract RPC.
//!
//! Thin by design: it encodes the operation payload, wraps it in the RPC's
//! JSON envelope and maps the response. No retry logic lives here — the
//! scheduler owns retries.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::ContractGateway;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::payload;
use crate::types::{BatchEntry, DepositId, PoolId, PoolParameters, WithdrawalCall};

#[derive(Clone)]
pub struct HttpContractGateway {
    http: Client,
    endpoint: String,
    contract_address: String,
}

#[derive(Debug, Deserialize)]
struct SubmitEnvelope {
    ok: bool,
    reference: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DepositEnvelope {
    ok: bool,
    deposit_id: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PoolEnvelope {
    fee_ppm: u32,
    min_amount: u64,
    max_amount: u64,
    min_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
struct LimitsEnvelope {
    max_batch_size: u32,
}

impl HttpContractGateway {
    pub fn new(cfg: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            endpoint: cfg.network.endpoint().to_string(),
            contract_address: cfg.contract_address,
        })
    }

    /// POST a signed operation payload and return the ledger reference.
    async fn send_operation(&self, payload: Vec<u8>) -> Result<String, GatewayError> {
        let url = format!("{}/v2/messages", self.endpoint);

        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "address": self.contract_address,
                "payload": BASE64.encode(&payload),
            }))
            .send()
            .await?
            .error_for_status()?;

        let envelope: SubmitEnvelope = resp.json().await?;

        if !envelope.ok {
            return Err(GatewayError::Rejected(
                envelope.error.unwrap_or_else(|| "unspecified".into()),
            ));
        }

        envelope
            .reference
            .ok_or_else(|| GatewayError::Rejected("accepted without reference".into()))
    }
}

#[async_trait]
impl ContractGateway for HttpContractGateway {
    #[instrument(skip(self), level = "debug")]
    async fn read_pool_parameters(
        &self,
        pool_id: PoolId,
    ) -> Result<PoolParameters, GatewayError> {
        let url = format!(
            "{}/v2/contract/{}/pools/{}",
            self.endpoint, self.contract_address, pool_id
        );

        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let envelope: PoolEnvelope = resp.json().await?;

        debug!(
            pool_id,
            fee_ppm = envelope.fee_ppm,
            min_amount = envelope.min_amount,
            max_amount = envelope.max_amount,
            "pool parameters fetched"
        );

        Ok(PoolParameters {
            fee_rate: envelope.fee_ppm as f64 / 1_000_000.0,
            min_amount: envelope.min_amount,
            max_amount: envelope.max_amount,
            min_delay_ms: envelope.min_delay_ms,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn read_batch_capacity(&self) -> Result<u32, GatewayError> {
        let url = format!(
            "{}/v2/contract/{}/limits",
            self.endpoint, self.contract_address
        );

        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let envelope: LimitsEnvelope = resp.json().await?;

        Ok(envelope.max_batch_size)
    }

    #[instrument(skip(self), fields(pool_id, amount), level = "debug")]
    async fn submit_deposit(
        &self,
        pool_id: PoolId,
        amount: u64,
    ) -> Result<DepositId, GatewayError> {
        let url = format!("{}/v2/messages", self.endpoint);
        let payload = payload::encode_deposit(pool_id, amount);

        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "address": self.contract_address,
                "payload": BASE64.encode(&payload),
            }))
            .send()
            .await?
            .error_for_status()?;

        let envelope: DepositEnvelope = resp.json().await?;

        if !envelope.ok {
            return Err(GatewayError::Rejected(
                envelope.error.unwrap_or_else(|| "unspecified".into()),
            ));
        }

        envelope
            .deposit_id
            .ok_or_else(|| GatewayError::Rejected("deposit accepted without id".into()))
    }

    #[instrument(
        skip(self, call),
        fields(deposit_id = call.deposit_id, amount = call.amount),
        level = "debug"
    )]
    async fn submit_withdrawal(&self, call: &WithdrawalCall) -> Result<String, GatewayError> {
        self.send_operation(payload::encode_withdrawal(call)).await
    }

    #[instrument(skip(self, entries), fields(deposit_id, count = entries.len()), level = "debug")]
    async fn submit_batch_withdrawal(
        &self,
        deposit_id: DepositId,
        entries: &[BatchEntry],
        max_batch_size: u32,
    ) -> Result<String, GatewayError> {
        if entries.len() > max_batch_size as usize {
            return Err(GatewayError::BatchTooLarge {
                got: entries.len(),
                max: max_batch_size,
            });
        }

        self.send_operation(payload::encode_batch_withdrawal(deposit_id, entries))
            .await
    }
}

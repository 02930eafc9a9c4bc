use crate::error::RelayerError;
use anyhow::{Context, Result};
use ethers::types::Address;
use serde_json::Value;
use tracing::warn;

const MINE_FALLBACK_ERROR: &str =
    "Relayer mining request failed. Please retry later via the relayer service.";

/// Outcome of a successful remote mining request.
#[derive(Debug, Clone)]
pub struct MineOutcome {
    pub tx_hash: String,
    pub reward: String,
    pub block_number: Option<u64>,
}

/// Client for the remote mining relayer. Mining transactions are produced by
/// a separate proof-of-work/anti-abuse service, so this path never touches
/// the local signer or the nonce lock.
pub struct RemoteRelayerClient {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl RemoteRelayerClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// `POST {base}/mine {address}`. Tolerates the relayer's loose response
    /// shape: `txHash` or `transactionHash`, reward and block number either
    /// top-level or nested under `data`.
    pub async fn mine(&self, address: Address) -> Result<MineOutcome> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(RelayerError::RelayerNotConfigured)?;

        let response = self
            .http
            .post(format!("{base}/mine"))
            .json(&serde_json::json!({ "address": format!("{address:#x}") }))
            .send()
            .await
            .context("Relayer /mine request failed")?;

        let status = response.status();
        let raw = response.text().await.unwrap_or_default();

        let payload: Option<Value> = match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                if !raw.is_empty() {
                    warn!("Failed to parse relayer mining response: {e}");
                }
                None
            }
        };

        let succeeded = payload
            .as_ref()
            .and_then(|p| p.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !status.is_success() || !succeeded {
            let message = payload
                .as_ref()
                .and_then(|p| {
                    p.get("error")
                        .or_else(|| p.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .or_else(|| (!raw.is_empty()).then(|| raw.clone()))
                .unwrap_or_else(|| MINE_FALLBACK_ERROR.to_string());

            return Err(RelayerError::RelayerRejected(message).into());
        }

        let payload = payload.unwrap_or(Value::Null);

        let tx_hash = payload
            .get("txHash")
            .or_else(|| payload.get("transactionHash"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                RelayerError::RelayerRejected(
                    "Relayer did not return a transaction hash. Please retry later via the relayer service."
                        .to_string(),
                )
            })?;

        let reward_value = payload
            .get("reward")
            .or_else(|| payload.pointer("/data/reward"))
            .cloned()
            .unwrap_or(Value::from(0));
        let reward = match reward_value {
            Value::String(s) => s,
            other => other.to_string(),
        };

        let block_number = payload
            .get("blockNumber")
            .or_else(|| payload.pointer("/data/blockNumber"))
            .and_then(Value::as_u64);

        Ok(MineOutcome {
            tx_hash,
            reward,
            block_number,
        })
    }
}

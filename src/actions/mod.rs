//! Action handlers: the public operations the relayer performs on behalf of
//! end users. Each handler runs input validation, rate limiting, any
//! preflight reads, then the nonce-locked send, and converts every internal
//! failure into the [`ActionResult`] envelope; nothing propagates across
//! this boundary as a raw error.

mod faucet;
mod mining;
mod wallet;

pub use faucet::{FaucetClaimReceipt, FaucetStatusView};
pub use mining::{ClaimReceipt, MineReceipt};
pub use wallet::{FundReceipt, StressFundReceipt};

use crate::error::RelayerError;
use serde::Serialize;

/// Uniform success/failure envelope returned by every public operation.
/// Serializes as `{success, data?, error?}`.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Converts an internal error into a failure envelope, logging it
    /// server-side first. Expected rejections (validation, limits,
    /// preconditions) log at warn; anything else at error with the full
    /// chain, though only the message string reaches the caller.
    pub fn from_error(action: &'static str, error: anyhow::Error) -> Self {
        match error.downcast_ref::<RelayerError>() {
            Some(
                RelayerError::Validation(_)
                | RelayerError::RateLimitExceeded { .. }
                | RelayerError::Precondition(_)
                | RelayerError::RelayerNotConfigured
                | RelayerError::RelayerRejected(_),
            ) => {
                tracing::warn!(action, error = %error, "action rejected");
            }
            _ => {
                tracing::error!(action, error = ?error, "action failed");
            }
        }

        Self::fail(error.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_the_error_field() {
        let result = ActionResult::ok(serde_json::json!({ "txHash": "0xabc" }));
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({ "success": true, "data": { "txHash": "0xabc" } })
        );
    }

    #[test]
    fn failure_envelope_omits_the_data_field() {
        let result: ActionResult<()> = ActionResult::fail("nope");
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire, serde_json::json!({ "success": false, "error": "nope" }));
    }
}

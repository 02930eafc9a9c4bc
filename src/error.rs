//! # Relayer Error Types
//!
//! Centralized error definitions for the relayer core. Every failure that
//! reaches a caller is converted into an `ActionResult` envelope; these types
//! exist so the handlers and tests can distinguish the failure classes.

use thiserror::Error;

/// Unified error type for relayer operations.
#[derive(Error, Debug)]
pub enum RelayerError {
    /// Malformed input. Never retried, never touches the network.
    #[error("{0}")]
    Validation(String),

    /// The fixed-window quota for (category, subject) is exhausted.
    #[error("Rate limit exceeded for {category}:{subject} ({limit} requests per window)")]
    RateLimitExceeded {
        category: &'static str,
        subject: String,
        limit: u64,
    },

    /// A business precondition failed before any chain mutation
    /// (no pending rewards, faucet cooldown active).
    #[error("{0}")]
    Precondition(String),

    /// The remote relayer endpoint is missing from configuration.
    #[error("Relayer endpoint is not configured")]
    RelayerNotConfigured,

    /// The remote relayer answered with a non-success status or payload.
    #[error("{0}")]
    RelayerRejected(String),

    /// Transient network failure that survived the retry budget.
    #[error("Network error during {label}: {message}")]
    Network { label: String, message: String },

    /// The chain rejected the transaction outright (revert, insufficient
    /// funds, bad nonce). Never retried.
    #[error("Chain rejected {label}: {message}")]
    ChainRejected { label: String, message: String },
}

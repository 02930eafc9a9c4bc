//! # Omega Relayer Core
//!
//! Custodial relayer backend: one signing identity submits transactions on
//! behalf of end users who hold no gas of their own (wallet funding, mining
//! reward claims, faucet claims). The crate coordinates many concurrent
//! requests against that shared key through per-address nonce locking,
//! per-category rate limits, and retry/backoff around chain RPC.
//!
//! ## Modules
//!
//! - [`actions`] - Action handlers and the `ActionResult` envelope
//! - [`chain`] - The `ChainClient` seam and chain data types
//! - [`config`] - File + environment configuration
//! - [`error`] - Typed error taxonomy with thiserror
//! - [`gas`] - Gas price oracle with floor fallback
//! - [`limiter`] - Fixed-window rate limiting per (category, subject)
//! - [`nonce`] - Per-address nonce lock and allocation
//! - [`relayer_http`] - Remote mining relayer client
//! - [`retry`] - Bounded retry/backoff with error classification
//! - [`service`] - The `RelayerService` entry point
//! - [`signer`] - Production ethers signer implementation

pub mod actions;
pub mod chain;
pub mod config;
pub mod error;
pub mod gas;
pub mod limiter;
pub mod logger;
pub mod nonce;
pub mod relayer_http;
pub mod retry;
pub mod service;
pub mod signer;
pub mod validation;

pub use actions::{
    ActionResult, ClaimReceipt, FaucetClaimReceipt, FaucetStatusView, FundReceipt, MineReceipt,
    StressFundReceipt,
};
pub use chain::{ChainClient, FaucetStatus, MinerInfo, ValueTransfer};
pub use config::{RateLimitConfig, RateLimitSettings, RelayerConfig};
pub use error::RelayerError;
pub use gas::{GasPriceFetch, GasPriceOracle};
pub use limiter::{RateCategory, RateLimiter};
pub use logger::setup_logger;
pub use nonce::{NonceHandle, NonceManager};
pub use relayer_http::{MineOutcome, RemoteRelayerClient};
pub use retry::{is_transient_error, with_network_retry, RetryConfig};
pub use service::{ActionKind, ExecutionStrategy, RelayerService, RelayerStatusView};
pub use signer::EthersChain;

use crate::actions::ActionResult;
use crate::chain::ChainClient;
use crate::config::RelayerConfig;
use crate::gas::GasPriceOracle;
use crate::limiter::RateLimiter;
use crate::nonce::NonceManager;
use crate::relayer_http::RemoteRelayerClient;
use crate::retry::with_network_retry;
use crate::signer::EthersChain;
use anyhow::Result;
use chrono::Utc;
use ethers::utils::format_ether;
use serde::Serialize;
use std::sync::Arc;

/// How an action reaches the chain. Funding and claiming run through the
/// local signer under the nonce lock; mining is delegated to the remote
/// relayer HTTP service and never touches the signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    LocalSigner,
    RemoteRelayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    FundWallet,
    FundStressWallet,
    ExecuteMine,
    ClaimRewards,
    ClaimFaucet,
    GetFaucetStatus,
}

impl ActionKind {
    /// Single source of truth for the strategy split.
    pub const fn strategy(self) -> ExecutionStrategy {
        match self {
            ActionKind::ExecuteMine => ExecutionStrategy::RemoteRelayer,
            ActionKind::FundWallet
            | ActionKind::FundStressWallet
            | ActionKind::ClaimRewards
            | ActionKind::ClaimFaucet
            | ActionKind::GetFaucetStatus => ExecutionStrategy::LocalSigner,
        }
    }
}

/// Operational snapshot of the relayer identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerStatusView {
    pub relayer_address: String,
    pub balance: String,
    pub block_number: u64,
    pub timestamp: String,
    pub relayer_endpoint_configured: bool,
}

/// The relayer domain service: one signing identity, one nonce sequence,
/// shared rate limits. Constructed once at process startup and passed by
/// reference into every caller; all lock state is private to its fields.
pub struct RelayerService {
    pub(crate) chain: Arc<dyn ChainClient>,
    pub(crate) nonce: NonceManager,
    pub(crate) limiter: RateLimiter,
    pub(crate) gas: Arc<GasPriceOracle>,
    pub(crate) relayer: RemoteRelayerClient,
    pub(crate) config: RelayerConfig,
}

impl RelayerService {
    pub fn new(chain: Arc<dyn ChainClient>, config: RelayerConfig) -> Self {
        let limiter = RateLimiter::new(&config.rate_limits);
        let nonce = NonceManager::new(chain.clone(), config.retry.clone());
        let gas = Arc::new(GasPriceOracle::new(
            chain.clone(),
            config.gas_floor_wei,
            config.retry.clone(),
        ));
        let relayer = RemoteRelayerClient::new(config.relayer_url.clone());

        Self {
            chain,
            nonce,
            limiter,
            gas,
            relayer,
            config,
        }
    }

    /// Connects the production ethers signer from configuration.
    pub fn connect(config: RelayerConfig) -> Result<Self> {
        let chain = Arc::new(EthersChain::connect(&config)?);
        Ok(Self::new(chain, config))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Operational insight into the relayer: balance, block height, and
    /// whether the remote mining endpoint is configured.
    pub async fn relayer_status(&self) -> ActionResult<RelayerStatusView> {
        let chain = self.chain.clone();

        let result = with_network_retry(&self.config.retry, "relayerStatus", || {
            let chain = chain.clone();
            async move {
                let balance = chain.relayer_balance().await?;
                let block_number = chain.block_number().await?;
                Ok((balance, block_number))
            }
        })
        .await;

        match result {
            Ok((balance, block_number)) => ActionResult::ok(RelayerStatusView {
                relayer_address: format!("{:#x}", self.chain.relayer_address()),
                balance: format_ether(balance),
                block_number,
                timestamp: Utc::now().to_rfc3339(),
                relayer_endpoint_configured: self.relayer.is_configured(),
            }),
            Err(e) => ActionResult::from_error("relayerStatus", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_mining_uses_the_remote_relayer() {
        assert_eq!(
            ActionKind::ExecuteMine.strategy(),
            ExecutionStrategy::RemoteRelayer
        );

        for kind in [
            ActionKind::FundWallet,
            ActionKind::FundStressWallet,
            ActionKind::ClaimRewards,
            ActionKind::ClaimFaucet,
            ActionKind::GetFaucetStatus,
        ] {
            assert_eq!(kind.strategy(), ExecutionStrategy::LocalSigner);
        }
    }
}

use crate::actions::ActionResult;
use crate::error::RelayerError;
use crate::limiter::RateCategory;
use crate::service::{ActionKind, ExecutionStrategy, RelayerService};
use crate::validation;
use anyhow::Result;
use ethers::types::Address;
use ethers::utils::format_ether;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MineReceipt {
    pub tx_hash: String,
    pub reward: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    pub tx_hash: String,
    /// Pre-claim pending balance, formatted to decimal ether.
    pub amount: String,
}

impl RelayerService {
    /// Executes the mining transaction for `address`. Mining is delegated to
    /// the remote relayer service rather than the local signer, because the
    /// mining transaction is produced by a separate proof-of-work/anti-abuse
    /// service.
    pub async fn execute_mine(&self, address: &str) -> ActionResult<MineReceipt> {
        let miner = match validation::validate_address(address) {
            Ok(miner) => miner,
            Err(e) => return ActionResult::fail(e.to_string()),
        };

        match self.mine_inner(miner).await {
            Ok(receipt) => ActionResult::ok(receipt),
            Err(e) => ActionResult::from_error("executeMine", e),
        }
    }

    async fn mine_inner(&self, miner: Address) -> Result<MineReceipt> {
        self.limiter
            .enforce(RateCategory::Blockchain, &format!("{miner:#x}"))?;

        let outcome = match ActionKind::ExecuteMine.strategy() {
            ExecutionStrategy::RemoteRelayer => self.relayer.mine(miner).await?,
            ExecutionStrategy::LocalSigner => {
                // Mining never runs through the local signer; the mapping in
                // ActionKind::strategy is pinned by a unit test.
                return Err(RelayerError::RelayerNotConfigured.into());
            }
        };

        Ok(MineReceipt {
            tx_hash: outcome.tx_hash,
            reward: outcome.reward,
            block_number: outcome.block_number,
        })
    }

    /// Claims pending mining rewards for `address` through the relayer
    /// signer. Fails fast when nothing is pending, without consuming a
    /// rate-limit slot or the nonce lock.
    pub async fn claim_rewards(&self, address: &str) -> ActionResult<ClaimReceipt> {
        let recipient = match validation::validate_address(address) {
            Ok(recipient) => recipient,
            Err(e) => return ActionResult::fail(e.to_string()),
        };

        match self.claim_rewards_inner(recipient).await {
            Ok(receipt) => ActionResult::ok(receipt),
            Err(e) => ActionResult::from_error("claimRewards", e),
        }
    }

    async fn claim_rewards_inner(&self, recipient: Address) -> Result<ClaimReceipt> {
        // Read-only preflight, no lock involved.
        let info = self.chain.miner_info(recipient).await?;

        if info.pending_rewards.is_zero() {
            return Err(RelayerError::Precondition(
                "No pending rewards available to claim".to_string(),
            )
            .into());
        }

        self.limiter
            .enforce(RateCategory::Blockchain, &format!("{recipient:#x}"))?;

        let gas_fetch = self.gas.spawn_fetch();
        let relayer_address = self.chain.relayer_address();
        let chain = self.chain.clone();

        let tx_hash = self
            .nonce
            .with_lock(relayer_address, move |handle| async move {
                let nonce = handle.fresh_nonce().await?;
                let gas_price = gas_fetch.join().await;
                chain.claim_rewards_to(recipient, gas_price, nonce).await
            })
            .await?;

        // The lock is released at broadcast; waiting out confirmation here
        // would otherwise stall every other pending action.
        let tx_hash = self.chain.confirm(tx_hash).await?;

        Ok(ClaimReceipt {
            tx_hash: format!("{tx_hash:#x}"),
            amount: format_ether(info.pending_rewards),
        })
    }
}

use crate::actions::ActionResult;
use crate::error::RelayerError;
use crate::limiter::RateCategory;
use crate::service::RelayerService;
use crate::validation;
use anyhow::Result;
use ethers::types::Address;
use ethers::utils::format_ether;
use serde::Serialize;

const FAUCET_COOLDOWN_HOURS: u32 = 24;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaucetClaimReceipt {
    pub tx_hash: String,
    pub amount: String,
    pub cooldown_hours: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaucetStatusView {
    pub can_claim_now: bool,
    pub last_claim: u64,
    pub time_until_next_claim: u64,
    pub claim_amount: String,
    pub faucet_balance: String,
}

impl RelayerService {
    /// Executes a faucet claim for `address`, honoring the contract's
    /// 24-hour cooldown. A cooldown rejection consumes neither a rate-limit
    /// slot nor the nonce lock.
    pub async fn claim_faucet(&self, address: &str) -> ActionResult<FaucetClaimReceipt> {
        let wallet = match validation::validate_address(address) {
            Ok(wallet) => wallet,
            Err(e) => return ActionResult::fail(e.to_string()),
        };

        match self.claim_faucet_inner(wallet).await {
            Ok(receipt) => ActionResult::ok(receipt),
            Err(e) => ActionResult::from_error("claimFaucet", e),
        }
    }

    async fn claim_faucet_inner(&self, wallet: Address) -> Result<FaucetClaimReceipt> {
        // Read-only preflight, no lock involved.
        let status = self.chain.faucet_status(wallet).await?;

        if !status.can_claim_now {
            let cooldown_seconds = status.time_until_next_claim.as_u64();
            let cooldown_hours = cooldown_seconds.div_ceil(3600);
            return Err(RelayerError::Precondition(format!(
                "Faucet cooldown active. Try again in ~{cooldown_hours} hour(s)."
            ))
            .into());
        }

        self.limiter
            .enforce(RateCategory::Faucet, &format!("{wallet:#x}"))?;

        let gas_fetch = self.gas.spawn_fetch();
        let relayer_address = self.chain.relayer_address();
        let chain = self.chain.clone();

        let tx_hash = self
            .nonce
            .with_lock(relayer_address, move |handle| async move {
                let nonce = handle.fresh_nonce().await?;
                let gas_price = gas_fetch.join().await;
                chain.claim_faucet(gas_price, nonce).await
            })
            .await?;

        // The lock is released at broadcast; waiting out confirmation here
        // would otherwise stall every other pending action.
        let tx_hash = self.chain.confirm(tx_hash).await?;

        Ok(FaucetClaimReceipt {
            tx_hash: format!("{tx_hash:#x}"),
            amount: format_ether(status.claim_amount),
            cooldown_hours: FAUCET_COOLDOWN_HOURS,
        })
    }

    /// Current faucet state for `address`: cooldown timings, claim amount,
    /// and the faucet's own balance. Pure read; touches neither the rate
    /// limiter nor the lock nor the signer's sending capability.
    pub async fn get_faucet_status(&self, address: &str) -> ActionResult<FaucetStatusView> {
        let wallet = match validation::validate_address(address) {
            Ok(wallet) => wallet,
            Err(e) => return ActionResult::fail(e.to_string()),
        };

        match self.faucet_status_inner(wallet).await {
            Ok(view) => ActionResult::ok(view),
            Err(e) => ActionResult::from_error("getFaucetStatus", e),
        }
    }

    async fn faucet_status_inner(&self, wallet: Address) -> Result<FaucetStatusView> {
        let status = self.chain.faucet_status(wallet).await?;
        let balance = self.chain.faucet_balance().await?;

        Ok(FaucetStatusView {
            can_claim_now: status.can_claim_now,
            last_claim: status.last_claim.as_u64(),
            time_until_next_claim: status.time_until_next_claim.as_u64(),
            claim_amount: format_ether(status.claim_amount),
            faucet_balance: format_ether(balance),
        })
    }
}

use crate::actions::ActionResult;
use crate::chain::ValueTransfer;
use crate::limiter::RateCategory;
use crate::service::RelayerService;
use crate::validation;
use anyhow::{Context, Result};
use ethers::types::{Address, U256};
use ethers::utils::parse_ether;
use serde::Serialize;
use std::time::Instant;

const TRANSFER_GAS_LIMIT: u64 = 21_000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundReceipt {
    pub tx_hash: String,
    /// Milliseconds from nonce acquisition to node acceptance of the send.
    pub response_time: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressFundReceipt {
    pub tx_hash: String,
}

impl RelayerService {
    /// Funds a user wallet from the relayer. Intended for onboarding flows
    /// where a small amount of gas is required to cover initial
    /// transactions.
    pub async fn fund_wallet(
        &self,
        address: &str,
        amount: Option<&str>,
    ) -> ActionResult<FundReceipt> {
        let input = match validation::validate_request(address, amount) {
            Ok(input) => input,
            Err(e) => return ActionResult::fail(e.to_string()),
        };

        match self
            .fund_inner(input.address, input.amount, &self.config.default_fund_amount)
            .await
        {
            Ok(receipt) => ActionResult::ok(receipt),
            Err(e) => ActionResult::from_error("fundWallet", e),
        }
    }

    /// High-value wallet funding used for stress testing and QA scenarios.
    pub async fn fund_stress_wallet(
        &self,
        address: &str,
        amount: Option<&str>,
    ) -> ActionResult<StressFundReceipt> {
        let input = match validation::validate_request(address, amount) {
            Ok(input) => input,
            Err(e) => return ActionResult::fail(e.to_string()),
        };

        match self
            .fund_inner(input.address, input.amount, &self.config.default_stress_amount)
            .await
        {
            Ok(receipt) => ActionResult::ok(StressFundReceipt {
                tx_hash: receipt.tx_hash,
            }),
            Err(e) => ActionResult::from_error("fundStressWallet", e),
        }
    }

    async fn fund_inner(
        &self,
        destination: Address,
        amount: Option<U256>,
        default: &str,
    ) -> Result<FundReceipt> {
        let value = match amount {
            Some(value) => value,
            None => parse_ether(default).context("Invalid default fund amount")?,
        };

        self.limiter
            .enforce(RateCategory::Blockchain, &format!("{destination:#x}"))?;

        // Kick the gas price fetch off now; it has no ordering dependency on
        // nonce allocation and is joined only at transaction-build time.
        let gas_fetch = self.gas.spawn_fetch();
        let relayer_address = self.chain.relayer_address();
        let chain = self.chain.clone();

        self.nonce
            .with_lock(relayer_address, move |handle| async move {
                let nonce = handle.fresh_nonce().await?;
                let started = Instant::now();
                let gas_price = gas_fetch.join().await;

                let transfer = ValueTransfer {
                    to: destination,
                    value,
                    gas_limit: U256::from(TRANSFER_GAS_LIMIT),
                    gas_price,
                    nonce,
                };

                // Broadcast exactly once. The retry budget covers the
                // preparation RPCs above, never a re-send.
                let tx_hash = chain
                    .send_value(transfer)
                    .await
                    .context("fundWallet:sendTransaction")?;

                Ok(FundReceipt {
                    tx_hash: format!("{tx_hash:#x}"),
                    response_time: started.elapsed().as_millis() as u64,
                })
            })
            .await
    }
}

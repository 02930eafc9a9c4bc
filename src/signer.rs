use crate::chain::{ChainClient, FaucetStatus, MinerInfo, ValueTransfer};
use crate::config::RelayerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::abi::Abi;
use ethers::contract::Contract;
use ethers::middleware::SignerMiddleware;
use ethers::prelude::*;
use std::sync::Arc;

const MINING_ABI: &str = r#"[
  {
    "type": "function",
    "name": "getMinerInfo",
    "stateMutability": "view",
    "inputs": [{ "name": "miner", "type": "address" }],
    "outputs": [{ "name": "pendingRewards", "type": "uint256" }]
  },
  {
    "type": "function",
    "name": "claimTo",
    "stateMutability": "nonpayable",
    "inputs": [{ "name": "recipient", "type": "address" }],
    "outputs": []
  }
]"#;

const FAUCET_ABI: &str = r#"[
  {
    "type": "function",
    "name": "getFaucetStatus",
    "stateMutability": "view",
    "inputs": [{ "name": "wallet", "type": "address" }],
    "outputs": [
      { "name": "canClaimNow", "type": "bool" },
      { "name": "lastClaim", "type": "uint256" },
      { "name": "timeUntilNextClaim", "type": "uint256" },
      { "name": "claimAmount", "type": "uint256" }
    ]
  },
  {
    "type": "function",
    "name": "claim",
    "stateMutability": "nonpayable",
    "inputs": [],
    "outputs": []
  }
]"#;

type RelayerMiddleware = SignerMiddleware<Provider<Http>, LocalWallet>;

/// The relayer signing identity: one wallet, one RPC connection, and the
/// mining/faucet contract bindings. Shared across all concurrent handlers;
/// the nonce discipline lives in [`crate::nonce`], not here.
pub struct EthersChain {
    client: Arc<RelayerMiddleware>,
    address: Address,
    mining: Contract<RelayerMiddleware>,
    faucet: Contract<RelayerMiddleware>,
    faucet_address: Address,
}

impl EthersChain {
    pub fn connect(config: &RelayerConfig) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .context("Invalid RPC URL")?;
        let wallet = config
            .relayer_private_key
            .parse::<LocalWallet>()
            .context("Invalid relayer private key")?
            .with_chain_id(config.chain_id);
        let address = wallet.address();
        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        let mining_address = config
            .mining_contract
            .parse::<Address>()
            .context("Invalid mining contract address")?;
        let faucet_address = config
            .faucet_contract
            .parse::<Address>()
            .context("Invalid faucet contract address")?;

        let mining_abi: Abi = serde_json::from_str(MINING_ABI)?;
        let faucet_abi: Abi = serde_json::from_str(FAUCET_ABI)?;

        Ok(Self {
            mining: Contract::new(mining_address, mining_abi, client.clone()),
            faucet: Contract::new(faucet_address, faucet_abi, client.clone()),
            client,
            address,
            faucet_address,
        })
    }
}

#[async_trait]
impl ChainClient for EthersChain {
    fn relayer_address(&self) -> Address {
        self.address
    }

    async fn pending_nonce(&self, address: Address) -> Result<U256> {
        let nonce = self
            .client
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .context("Failed to fetch pending nonce")?;
        Ok(nonce)
    }

    async fn gas_price(&self) -> Result<U256> {
        let price = self
            .client
            .get_gas_price()
            .await
            .context("Failed to fetch gas price")?;
        Ok(price)
    }

    async fn send_value(&self, transfer: ValueTransfer) -> Result<H256> {
        let tx = TransactionRequest::new()
            .from(self.address)
            .to(transfer.to)
            .value(transfer.value)
            .gas(transfer.gas_limit)
            .gas_price(transfer.gas_price)
            .nonce(transfer.nonce);

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .context("sendTransaction rejected")?;

        Ok(pending.tx_hash())
    }

    async fn miner_info(&self, miner: Address) -> Result<MinerInfo> {
        let pending_rewards: U256 = self
            .mining
            .method::<_, U256>("getMinerInfo", miner)?
            .call()
            .await
            .context("getMinerInfo call failed")?;

        Ok(MinerInfo { pending_rewards })
    }

    async fn claim_rewards_to(
        &self,
        recipient: Address,
        gas_price: U256,
        nonce: U256,
    ) -> Result<H256> {
        let mut call = self.mining.method::<_, ()>("claimTo", recipient)?;
        call.tx.set_gas_price(gas_price);
        call.tx.set_nonce(nonce);

        let pending = call.send().await.context("claimTo rejected")?;
        Ok(pending.tx_hash())
    }

    async fn faucet_status(&self, wallet: Address) -> Result<FaucetStatus> {
        let (can_claim_now, last_claim, time_until_next_claim, claim_amount): (
            bool,
            U256,
            U256,
            U256,
        ) = self
            .faucet
            .method::<_, (bool, U256, U256, U256)>("getFaucetStatus", wallet)?
            .call()
            .await
            .context("getFaucetStatus call failed")?;

        Ok(FaucetStatus {
            can_claim_now,
            last_claim,
            time_until_next_claim,
            claim_amount,
        })
    }

    async fn claim_faucet(&self, gas_price: U256, nonce: U256) -> Result<H256> {
        let mut call = self.faucet.method::<_, ()>("claim", ())?;
        call.tx.set_gas_price(gas_price);
        call.tx.set_nonce(nonce);

        let pending = call.send().await.context("claim rejected")?;
        Ok(pending.tx_hash())
    }

    async fn confirm(&self, tx_hash: H256) -> Result<H256> {
        let receipt = PendingTransaction::new(tx_hash, self.client.provider())
            .await
            .context("confirmation failed")?
            .context("transaction dropped from mempool")?;

        Ok(receipt.transaction_hash)
    }

    async fn faucet_balance(&self) -> Result<U256> {
        let balance = self
            .client
            .get_balance(self.faucet_address, None)
            .await
            .context("Failed to fetch faucet balance")?;
        Ok(balance)
    }

    async fn relayer_balance(&self) -> Result<U256> {
        let balance = self
            .client
            .get_balance(self.address, None)
            .await
            .context("Failed to fetch relayer balance")?;
        Ok(balance)
    }

    async fn block_number(&self) -> Result<u64> {
        let block = self
            .client
            .get_block_number()
            .await
            .context("Failed to fetch block number")?;
        Ok(block.as_u64())
    }
}

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};

/// Pending mining rewards for a user, read from the mining contract.
#[derive(Debug, Clone, Copy)]
pub struct MinerInfo {
    pub pending_rewards: U256,
}

/// Faucet cooldown state for a user, read from the faucet contract.
#[derive(Debug, Clone, Copy)]
pub struct FaucetStatus {
    pub can_claim_now: bool,
    pub last_claim: U256,
    pub time_until_next_claim: U256,
    pub claim_amount: U256,
}

/// A plain value transfer, built fresh per submission and never reused.
#[derive(Debug, Clone, Copy)]
pub struct ValueTransfer {
    pub to: Address,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub nonce: U256,
}

/// Seam between the handlers and the chain. The production implementation
/// is the ethers signer in [`crate::signer`]; tests substitute their own.
///
/// Read-only methods (`miner_info`, `faucet_status`, balances) carry no
/// ordering guarantee and must never be called under the nonce lock on the
/// hot path; the mutating methods consume a nonce and are only invoked from
/// inside a locked section.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the relayer signing identity.
    fn relayer_address(&self) -> Address;

    /// Next nonce as reported by the node, counting mempool transactions.
    async fn pending_nonce(&self, address: Address) -> Result<U256>;

    async fn gas_price(&self) -> Result<U256>;

    /// Broadcasts a value transfer and returns its hash at node acceptance
    /// (not confirmation). Must only be called while holding the nonce lock.
    async fn send_value(&self, transfer: ValueTransfer) -> Result<H256>;

    async fn miner_info(&self, miner: Address) -> Result<MinerInfo>;

    /// Broadcasts `claimTo(recipient)` on the mining contract and returns
    /// its hash at node acceptance. Must only be called while holding the
    /// nonce lock; confirmation happens via [`ChainClient::confirm`] after
    /// the lock is released.
    async fn claim_rewards_to(
        &self,
        recipient: Address,
        gas_price: U256,
        nonce: U256,
    ) -> Result<H256>;

    async fn faucet_status(&self, wallet: Address) -> Result<FaucetStatus>;

    /// Broadcasts `claim()` on the faucet contract and returns its hash at
    /// node acceptance. Must only be called while holding the nonce lock;
    /// confirmation happens via [`ChainClient::confirm`] after the lock is
    /// released.
    async fn claim_faucet(&self, gas_price: U256, nonce: U256) -> Result<H256>;

    /// Waits for a broadcast transaction to be mined and returns the hash
    /// from its receipt. Confirmation can take many blocks, so this must
    /// never run under the nonce lock.
    async fn confirm(&self, tx_hash: H256) -> Result<H256>;

    async fn faucet_balance(&self) -> Result<U256>;

    async fn relayer_balance(&self) -> Result<U256>;

    async fn block_number(&self) -> Result<u64>;
}

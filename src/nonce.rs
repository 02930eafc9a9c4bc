use crate::chain::ChainClient;
use crate::retry::{with_network_retry, RetryConfig};
use anyhow::Result;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Lock and nonce cache for one relayer address. Created lazily, lives for
/// the process lifetime.
#[derive(Debug)]
struct NonceEntry {
    /// tokio's Mutex queues waiters FIFO, which gives the strict ordering
    /// the nonce sequence depends on.
    lock: AsyncMutex<()>,
    /// Next nonce to hand out, covering transactions broadcast but not yet
    /// visible in the node's pending count. Only touched under `lock`.
    cached_next: Mutex<Option<U256>>,
}

/// Per-address mutual exclusion plus nonce allocation for the relayer
/// identity. All nonce-consuming work goes through [`NonceManager::with_lock`];
/// the closure gets a [`NonceHandle`] that reserves nonces for the locked
/// address.
pub struct NonceManager {
    chain: Arc<dyn ChainClient>,
    entries: Mutex<HashMap<Address, Arc<NonceEntry>>>,
    retry: RetryConfig,
}

impl NonceManager {
    pub fn new(chain: Arc<dyn ChainClient>, retry: RetryConfig) -> Self {
        Self {
            chain,
            entries: Mutex::new(HashMap::new()),
            retry,
        }
    }

    fn entry(&self, address: Address) -> Arc<NonceEntry> {
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(address)
            .or_insert_with(|| {
                Arc::new(NonceEntry {
                    lock: AsyncMutex::new(()),
                    cached_next: Mutex::new(None),
                })
            })
            .clone()
    }

    /// Runs `f` with exclusive access to `address`'s nonce sequence.
    /// Concurrent callers queue FIFO; the lock is released when `f` settles,
    /// on success and on error alike. A failure whose message mentions the
    /// nonce drops the local cache so the next caller re-reads the chain.
    pub async fn with_lock<T, F, Fut>(&self, address: Address, f: F) -> Result<T>
    where
        F: FnOnce(NonceHandle) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let entry = self.entry(address);
        let _guard = entry.lock.lock().await;

        let handle = NonceHandle {
            chain: self.chain.clone(),
            entry: entry.clone(),
            address,
            retry: self.retry.clone(),
        };

        match f(handle).await {
            Ok(value) => Ok(value),
            Err(e) => {
                if format!("{e:?}").to_lowercase().contains("nonce") {
                    *entry.cached_next.lock().unwrap() = None;
                    debug!("cleared cached nonce for {address:?} after nonce error");
                }
                Err(e)
            }
        }
    }
}

/// Capability to reserve nonces for one address, valid only inside the
/// critical section that created it.
pub struct NonceHandle {
    chain: Arc<dyn ChainClient>,
    entry: Arc<NonceEntry>,
    address: Address,
    retry: RetryConfig,
}

impl NonceHandle {
    /// Reserves the next nonce: the maximum of the node's pending count
    /// (covers externally confirmed transactions) and the local cache
    /// (covers broadcasts the node has not surfaced yet).
    pub async fn fresh_nonce(&self) -> Result<U256> {
        let chain = self.chain.clone();
        let address = self.address;

        let chain_next = with_network_retry(&self.retry, "getFreshNonce:getTransactionCount", || {
            let chain = chain.clone();
            async move { chain.pending_nonce(address).await }
        })
        .await?;

        let mut cached = self.entry.cached_next.lock().unwrap();
        let next = cached.map_or(chain_next, |local| local.max(chain_next));
        *cached = Some(next + U256::one());

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{FaucetStatus, MinerInfo, ValueTransfer};
    use async_trait::async_trait;
    use ethers::types::H256;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    struct StaticChain {
        base_nonce: u64,
        nonce_reads: AtomicU64,
    }

    impl StaticChain {
        fn new(base_nonce: u64) -> Self {
            Self {
                base_nonce,
                nonce_reads: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainClient for StaticChain {
        fn relayer_address(&self) -> Address {
            Address::zero()
        }

        async fn pending_nonce(&self, _address: Address) -> Result<U256> {
            self.nonce_reads.fetch_add(1, Ordering::SeqCst);
            Ok(U256::from(self.base_nonce))
        }

        async fn gas_price(&self) -> Result<U256> {
            unreachable!()
        }

        async fn send_value(&self, _transfer: ValueTransfer) -> Result<H256> {
            unreachable!()
        }

        async fn miner_info(&self, _miner: Address) -> Result<MinerInfo> {
            unreachable!()
        }

        async fn claim_rewards_to(
            &self,
            _recipient: Address,
            _gas_price: U256,
            _nonce: U256,
        ) -> Result<H256> {
            unreachable!()
        }

        async fn faucet_status(&self, _wallet: Address) -> Result<FaucetStatus> {
            unreachable!()
        }

        async fn claim_faucet(&self, _gas_price: U256, _nonce: U256) -> Result<H256> {
            unreachable!()
        }

        async fn confirm(&self, _tx_hash: H256) -> Result<H256> {
            unreachable!()
        }

        async fn faucet_balance(&self) -> Result<U256> {
            unreachable!()
        }

        async fn relayer_balance(&self) -> Result<U256> {
            unreachable!()
        }

        async fn block_number(&self) -> Result<u64> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn concurrent_sections_get_contiguous_distinct_nonces() {
        let chain = Arc::new(StaticChain::new(7));
        let manager = Arc::new(NonceManager::new(
            chain,
            RetryConfig::default().without_jitter(),
        ));

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .with_lock(Address::zero(), |handle| async move {
                        let nonce = handle.fresh_nonce().await?;
                        // Stagger completion so FIFO ordering is actually exercised.
                        tokio::time::sleep(Duration::from_millis(2 + (i % 3) * 3)).await;
                        Ok(nonce.as_u64())
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut nonces = Vec::new();
        for handle in handles {
            nonces.push(handle.await.unwrap());
        }
        nonces.sort_unstable();

        assert_eq!(nonces, (7..15).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn lock_is_released_when_the_section_fails() {
        let chain = Arc::new(StaticChain::new(0));
        let manager = NonceManager::new(chain, RetryConfig::default().without_jitter());

        let failed: Result<()> = manager
            .with_lock(Address::zero(), |_handle| async {
                Err(anyhow::anyhow!("boom"))
            })
            .await;
        assert!(failed.is_err());

        let nonce = manager
            .with_lock(Address::zero(), |handle| async move {
                handle.fresh_nonce().await
            })
            .await
            .unwrap();
        assert_eq!(nonce, U256::zero());
    }

    #[tokio::test]
    async fn nonce_error_resyncs_the_cache() {
        let chain = Arc::new(StaticChain::new(3));
        let manager = NonceManager::new(chain.clone(), RetryConfig::default().without_jitter());

        let first = manager
            .with_lock(Address::zero(), |handle| async move {
                handle.fresh_nonce().await
            })
            .await
            .unwrap();
        assert_eq!(first, U256::from(3));

        let _: Result<U256> = manager
            .with_lock(Address::zero(), |handle| async move {
                handle.fresh_nonce().await?;
                Err(anyhow::anyhow!("nonce too low"))
            })
            .await;

        // Cache was dropped, so the next allocation re-reads the chain value
        // instead of continuing from the stale local counter.
        let after = manager
            .with_lock(Address::zero(), |handle| async move {
                handle.fresh_nonce().await
            })
            .await
            .unwrap();
        assert_eq!(after, U256::from(3));
        assert_eq!(chain.nonce_reads.load(Ordering::SeqCst), 3);
    }
}

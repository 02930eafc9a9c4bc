use crate::chain::ChainClient;
use crate::retry::{with_network_retry, RetryConfig};
use ethers::types::U256;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Read-only gas price source. Falls back to the configured floor when the
/// chain query fails, so callers never fail on pricing alone. Independent of
/// the nonce lock: fetches are kicked off before the lock is taken and
/// joined at transaction-build time.
pub struct GasPriceOracle {
    chain: Arc<dyn ChainClient>,
    floor: U256,
    retry: RetryConfig,
}

impl GasPriceOracle {
    pub fn new(chain: Arc<dyn ChainClient>, floor_wei: u64, retry: RetryConfig) -> Self {
        Self {
            chain,
            floor: U256::from(floor_wei),
            retry,
        }
    }

    pub fn floor(&self) -> U256 {
        self.floor
    }

    /// Current gas price, or the floor after the retry budget is exhausted.
    pub async fn gas_price(&self) -> U256 {
        let chain = self.chain.clone();

        match with_network_retry(&self.retry, "getGasPrice", || {
            let chain = chain.clone();
            async move { chain.gas_price().await }
        })
        .await
        {
            Ok(price) if !price.is_zero() => price,
            Ok(_) => self.floor,
            Err(e) => {
                warn!("gas price query failed, using configured floor: {e:#}");
                self.floor
            }
        }
    }

    /// Starts a fetch on a separate task. Handlers call this before entering
    /// the nonce lock and join the result only when building the transaction,
    /// so the two I/O round-trips overlap.
    pub fn spawn_fetch(self: &Arc<Self>) -> GasPriceFetch {
        let oracle = self.clone();
        GasPriceFetch {
            floor: self.floor,
            handle: tokio::spawn(async move { oracle.gas_price().await }),
        }
    }
}

/// In-flight gas price fetch. Joining never fails: a lost task degrades to
/// the floor price.
pub struct GasPriceFetch {
    floor: U256,
    handle: JoinHandle<U256>,
}

impl GasPriceFetch {
    pub async fn join(self) -> U256 {
        match self.handle.await {
            Ok(price) => price,
            Err(e) => {
                warn!("gas price task aborted, using configured floor: {e}");
                self.floor
            }
        }
    }
}

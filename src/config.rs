use crate::retry::RetryConfig;
use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Quota for one rate-limit category.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub limit: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub blockchain: RateLimitConfig,
    pub faucet: RateLimitConfig,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            blockchain: RateLimitConfig {
                limit: 10,
                window_secs: 60,
            },
            faucet: RateLimitConfig {
                limit: 3,
                window_secs: 3600,
            },
        }
    }
}

/// Full relayer configuration. Loaded from an optional file plus
/// `RELAYER_`-prefixed environment variables; env wins.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayerConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub relayer_private_key: String,
    pub mining_contract: String,
    pub faucet_contract: String,
    /// Base URL of the remote mining relayer. Mining is disabled when unset.
    #[serde(default)]
    pub relayer_url: Option<String>,
    #[serde(default = "default_fund_amount")]
    pub default_fund_amount: String,
    #[serde(default = "default_stress_amount")]
    pub default_stress_amount: String,
    #[serde(default)]
    pub rate_limits: RateLimitSettings,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Gas price used when the chain query fails, in wei.
    #[serde(default = "default_gas_floor_wei")]
    pub gas_floor_wei: u64,
}

fn default_fund_amount() -> String {
    "0.1".to_string()
}

fn default_stress_amount() -> String {
    "1.0".to_string()
}

fn default_gas_floor_wei() -> u64 {
    1_000_000_000 // 1 gwei
}

impl RelayerConfig {
    pub fn load(path: &str) -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("RELAYER"))
            .build()?;

        settings.try_deserialize().map_err(|e| anyhow::anyhow!(e))
    }
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            chain_id: 1,
            relayer_private_key: String::new(),
            mining_contract: String::new(),
            faucet_contract: String::new(),
            relayer_url: None,
            default_fund_amount: default_fund_amount(),
            default_stress_amount: default_stress_amount(),
            rate_limits: RateLimitSettings::default(),
            retry: RetryConfig::default(),
            gas_floor_wei: default_gas_floor_wei(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_optional_sections() {
        let config = RelayerConfig::default();
        assert_eq!(config.default_fund_amount, "0.1");
        assert_eq!(config.default_stress_amount, "1.0");
        assert_eq!(config.rate_limits.blockchain.limit, 10);
        assert_eq!(config.rate_limits.faucet.window_secs, 3600);
        assert_eq!(config.gas_floor_wei, 1_000_000_000);
        assert!(config.relayer_url.is_none());
    }
}

use crate::error::RelayerError;
use anyhow::Result;
use rand::Rng;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Backoff parameters for chain RPC retries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub attempt_timeout_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            exponential_base: 2.0,
            attempt_timeout_ms: 10000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: base_delay_ms * 30,
            ..Default::default()
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout_ms: u64) -> Self {
        self.attempt_timeout_ms = attempt_timeout_ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.base_delay_ms as f64 * self.exponential_base.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        let delay_ms = if self.jitter {
            let rng_factor = rand::thread_rng().gen_range(0.5..=1.5);
            delay_ms * rng_factor
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Runs `operation` against the chain, retrying transient failures with
/// exponential backoff. Fatal errors (reverts, insufficient funds, bad
/// nonce, malformed params) propagate on the first attempt. Each attempt is
/// bounded by the configured per-attempt timeout.
///
/// The operation must be free of observable side effects until it succeeds:
/// callers wrap preparation RPCs (nonce reads, gas reads, status queries)
/// here, never the re-broadcast of an already-sent transaction.
pub async fn with_network_retry<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 0..=config.max_retries {
        let timeout = Duration::from_millis(config.attempt_timeout_ms);
        let result = match tokio::time::timeout(timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "timeout after {}ms",
                config.attempt_timeout_ms
            )),
        };

        match result {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}", label, attempt + 1);
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_transient_error(&e) {
                    debug!("{} hit non-retryable error: {}", label, e);
                    return Err(RelayerError::ChainRejected {
                        label: label.to_string(),
                        message: format!("{e:#}"),
                    }
                    .into());
                }

                if attempt == config.max_retries {
                    debug!("{} failed after {} attempts", label, attempt + 1);
                    return Err(RelayerError::Network {
                        label: label.to_string(),
                        message: format!("{e:#}"),
                    }
                    .into());
                }

                let delay = config.calculate_delay(attempt);
                debug!(
                    "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                    label,
                    attempt + 1,
                    config.max_retries + 1,
                    delay,
                    e
                );

                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!()
}

/// Substring classification of chain RPC errors. Anything not matching a
/// transient pattern is treated as a chain rejection and never retried;
/// "nonce too low" in particular is fatal here and handled by the nonce
/// cache resync instead of a blind retry.
pub fn is_transient_error(error: &anyhow::Error) -> bool {
    let error_msg = format!("{:?}", error).to_lowercase();

    let transient_patterns = [
        "timeout",
        "timed out",
        "connection refused",
        "connection reset",
        "broken pipe",
        "network error",
        "temporary failure",
        "service unavailable",
        "rate limited",
        "too many requests",
        "429",
    ];

    transient_patterns
        .iter()
        .any(|pattern| error_msg.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
            exponential_base: 2.0,
            attempt_timeout_ms: 1000,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let attempts = AtomicU32::new(0);

        let result = with_network_retry(&fast_config(), "test:flaky", || async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(anyhow::anyhow!("connection reset by peer"))
            } else {
                Ok(42u64)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);

        let result: Result<u64> = with_network_retry(&fast_config(), "test:revert", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("execution reverted: not owner"))
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RelayerError>(),
            Some(RelayerError::ChainRejected { .. })
        ));
    }

    #[tokio::test]
    async fn exhaustion_reports_the_label() {
        let attempts = AtomicU32::new(0);

        let result: Result<u64> = with_network_retry(&fast_config(), "test:down", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("service unavailable"))
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        let err = result.unwrap_err();
        match err.downcast_ref::<RelayerError>() {
            Some(RelayerError::Network { label, .. }) => assert_eq!(label, "test:down"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonce_too_low_is_fatal() {
        let attempts = AtomicU32::new(0);

        let result: Result<u64> = with_network_retry(&fast_config(), "test:nonce", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("nonce too low"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

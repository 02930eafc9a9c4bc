use crate::config::RateLimitSettings;
use crate::error::RelayerError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Abuse-limit categories. Each carries its own quota and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateCategory {
    Blockchain,
    Faucet,
}

impl RateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateCategory::Blockchain => "BLOCKCHAIN",
            RateCategory::Faucet => "FAUCET",
        }
    }
}

/// One fixed window for a (category, subject) key. Window index and count
/// are packed into a single word so rollover and increment commit in one
/// compare-exchange; a two-step reset would let a concurrent increment be
/// erased and admit more than the quota into a fresh window.
#[derive(Debug)]
struct WindowSlot {
    /// High 32 bits: window index (elapsed ms / window ms). Low 32 bits:
    /// attempts counted in that window.
    state: AtomicU64,
}

impl WindowSlot {
    fn pack(epoch: u64, count: u64) -> u64 {
        ((epoch & 0xffff_ffff) << 32) | (count & 0xffff_ffff)
    }

    fn unpack(state: u64) -> (u64, u64) {
        (state >> 32, state & 0xffff_ffff)
    }
}

#[derive(Debug, Clone, Copy)]
struct CategoryQuota {
    limit: u64,
    window: Duration,
}

/// Fixed-window rate limiter keyed by (category, subject). Slots are created
/// lazily; the map mutex guards only slot lookup, the counters themselves
/// are atomics.
#[derive(Debug)]
pub struct RateLimiter {
    slots: Mutex<HashMap<(RateCategory, String), Arc<WindowSlot>>>,
    quotas: HashMap<RateCategory, CategoryQuota>,
    started: Instant,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        let mut quotas = HashMap::new();
        quotas.insert(
            RateCategory::Blockchain,
            CategoryQuota {
                limit: settings.blockchain.limit,
                window: Duration::from_secs(settings.blockchain.window_secs),
            },
        );
        quotas.insert(
            RateCategory::Faucet,
            CategoryQuota {
                limit: settings.faucet.limit,
                window: Duration::from_secs(settings.faucet.window_secs),
            },
        );

        Self {
            slots: Mutex::new(HashMap::new()),
            quotas,
            started: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn current_epoch(&self, quota: CategoryQuota) -> u64 {
        self.now_ms() / (quota.window.as_millis() as u64).max(1)
    }

    fn get_or_create_slot(
        &self,
        category: RateCategory,
        subject: &str,
        epoch: u64,
    ) -> Arc<WindowSlot> {
        let mut slots = self.slots.lock().unwrap();

        if let Some(slot) = slots.get(&(category, subject.to_string())) {
            return slot.clone();
        }

        let slot = Arc::new(WindowSlot {
            state: AtomicU64::new(WindowSlot::pack(epoch, 0)),
        });
        slots.insert((category, subject.to_string()), slot.clone());
        slot
    }

    /// Counts one attempt for (category, subject) against the current
    /// window. Over-quota attempts are rejected but still consume the
    /// window, so hammering the limiter never shortens the wait.
    pub fn enforce(&self, category: RateCategory, subject: &str) -> Result<(), RelayerError> {
        let quota = self.quotas[&category];
        let epoch = self.current_epoch(quota);
        let slot = self.get_or_create_slot(category, subject, epoch);

        let mut observed = slot.state.load(Ordering::SeqCst);
        let count = loop {
            let (slot_epoch, slot_count) = WindowSlot::unpack(observed);
            let next_count = if slot_epoch == (epoch & 0xffff_ffff) {
                slot_count + 1
            } else {
                // Stale window: the rollover and this attempt's increment
                // commit together or not at all.
                1
            };

            match slot.state.compare_exchange_weak(
                observed,
                WindowSlot::pack(epoch, next_count),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break next_count,
                Err(current) => observed = current,
            }
        };

        if count > quota.limit {
            debug!(
                "rate limit hit for {}:{} ({}/{} in window)",
                category.as_str(),
                subject,
                count,
                quota.limit
            );
            return Err(RelayerError::RateLimitExceeded {
                category: category.as_str(),
                subject: subject.to_string(),
                limit: quota.limit,
            });
        }

        Ok(())
    }

    /// Attempts counted in the current window for (category, subject).
    /// Zero when the key has never been seen or its window has lapsed.
    pub fn attempts(&self, category: RateCategory, subject: &str) -> u64 {
        let epoch = self.current_epoch(self.quotas[&category]) & 0xffff_ffff;
        let slots = self.slots.lock().unwrap();
        slots
            .get(&(category, subject.to_string()))
            .map(|slot| {
                let (slot_epoch, count) = WindowSlot::unpack(slot.state.load(Ordering::SeqCst));
                if slot_epoch == epoch {
                    count
                } else {
                    0
                }
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;

    fn settings(limit: u64, window_secs: u64) -> RateLimitSettings {
        RateLimitSettings {
            blockchain: RateLimitConfig { limit, window_secs },
            faucet: RateLimitConfig { limit, window_secs },
        }
    }

    #[tokio::test]
    async fn five_concurrent_calls_against_limit_three() {
        let limiter = Arc::new(RateLimiter::new(&settings(3, 60)));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.enforce(RateCategory::Blockchain, "0xAAA").is_ok()
            }));
        }

        let mut ok = 0;
        let mut rejected = 0;
        for handle in handles {
            if handle.await.unwrap() {
                ok += 1;
            } else {
                rejected += 1;
            }
        }

        assert_eq!(ok, 3);
        assert_eq!(rejected, 2);
        assert_eq!(limiter.attempts(RateCategory::Blockchain, "0xAAA"), 5);
    }

    #[test]
    fn unrelated_subjects_do_not_share_windows() {
        let limiter = RateLimiter::new(&settings(1, 60));

        assert!(limiter.enforce(RateCategory::Blockchain, "0xAAA").is_ok());
        assert!(limiter.enforce(RateCategory::Blockchain, "0xAAA").is_err());
        assert!(limiter.enforce(RateCategory::Blockchain, "0xBBB").is_ok());
        assert!(limiter.enforce(RateCategory::Faucet, "0xAAA").is_ok());
    }

    #[tokio::test]
    async fn fresh_window_admits_exactly_the_limit_under_contention() {
        let limiter = Arc::new(RateLimiter::new(&settings(3, 1)));

        for _ in 0..3 {
            assert!(limiter.enforce(RateCategory::Blockchain, "0xDDD").is_ok());
        }
        assert!(limiter.enforce(RateCategory::Blockchain, "0xDDD").is_err());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        // All ten race the rollover; the new window still admits exactly
        // the quota and loses none of the attempts.
        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.enforce(RateCategory::Blockchain, "0xDDD").is_ok()
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap() {
                ok += 1;
            }
        }

        assert_eq!(ok, 3);
        assert_eq!(limiter.attempts(RateCategory::Blockchain, "0xDDD"), 10);
    }

    #[tokio::test]
    async fn window_expiry_resets_the_count() {
        let limiter = RateLimiter::new(&settings(1, 1));

        assert!(limiter.enforce(RateCategory::Faucet, "0xCCC").is_ok());
        assert!(limiter.enforce(RateCategory::Faucet, "0xCCC").is_err());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.enforce(RateCategory::Faucet, "0xCCC").is_ok());
    }

    #[test]
    fn rejection_carries_limit_context() {
        let limiter = RateLimiter::new(&settings(1, 60));
        limiter.enforce(RateCategory::Blockchain, "0xAAA").unwrap();

        let err = limiter
            .enforce(RateCategory::Blockchain, "0xAAA")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("BLOCKCHAIN"));
        assert!(message.contains("0xAAA"));
        assert!(message.contains('1'));
    }
}

//! Background sweep of expired challenge nonces and rate-limit windows.
//!
//! The Redis backend expires both through key TTLs. The in-memory tables
//! have no such mechanism, so abandoned entries are purged here.

use crate::storage::nonce::MemoryNonceStore;
use crate::storage::rate_limit::MemoryRateLimiter;
use chrono::Utc;
use std::time::{Duration, Instant};

/// Run the sweep loop.
///
/// Every `interval`, drops nonces whose challenge has expired and rate
/// counters whose window has closed.
pub async fn run_sweep_loop(
    nonces: MemoryNonceStore,
    limiter: MemoryRateLimiter,
    interval: Duration,
) {
    loop {
        tokio::time::sleep(interval).await;
        sweep_expired_nonces(&nonces);
        sweep_rate_limits(&limiter);
    }
}

/// Purge expired nonces once, returning how many were removed.
pub fn sweep_expired_nonces(store: &MemoryNonceStore) -> usize {
    let removed = store.purge_expired(Utc::now());

    if removed > 0 {
        tracing::info!(
            removed = removed,
            remaining = store.len(),
            "Nonce sweep completed"
        );
    }

    removed
}

/// Purge closed rate-limit windows once, returning how many were removed.
pub fn sweep_rate_limits(limiter: &MemoryRateLimiter) -> usize {
    let removed = limiter.purge_expired(Instant::now());

    if removed > 0 {
        tracing::debug!(removed = removed, "Rate limit sweep completed");
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = MemoryNonceStore::new();
        let now = Utc::now();
        let earlier = now - ChronoDuration::hours(1);
        store
            .insert("stale000001", now - ChronoDuration::seconds(10), earlier)
            .unwrap();
        store
            .insert("stale000002", now - ChronoDuration::minutes(5), earlier)
            .unwrap();
        store
            .insert("fresh000001", now + ChronoDuration::hours(1), now)
            .unwrap();

        assert_eq!(sweep_expired_nonces(&store), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(sweep_expired_nonces(&store), 0);
    }

    #[test]
    fn test_sweep_rate_limits_keeps_open_windows() {
        let limiter = MemoryRateLimiter::new();
        let now = Instant::now();
        limiter.hit("ratelimit:login:10.0.0.1", 5, Duration::from_millis(1), now);
        limiter.hit("ratelimit:login:10.0.0.2", 5, Duration::from_secs(3_600), now);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(sweep_rate_limits(&limiter), 1);
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_loop_runs_on_interval() {
        let store = MemoryNonceStore::new();
        let limiter = MemoryRateLimiter::new();
        let now = Utc::now();
        store
            .insert("stale000001", now - ChronoDuration::seconds(10), now - ChronoDuration::hours(1))
            .unwrap();
        limiter.hit("ratelimit:login:10.0.0.1", 5, Duration::from_millis(1), Instant::now());

        let handle = tokio::spawn(run_sweep_loop(
            store.clone(),
            limiter.clone(),
            Duration::from_millis(20),
        ));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.is_empty());
        assert!(limiter.is_empty());

        handle.abort();
    }
}

//! Fixed-window request counters.
//!
//! Redis key pattern (when a Redis URL is configured):
//! - `ratelimit:{scope}:{ip}`: request count, expires with its window

use crate::storage::nonce::StoreError;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    resets_at: Instant,
}

/// Process-local request counters.
#[derive(Clone, Default)]
pub struct MemoryRateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against `key`; true while the window allows it.
    pub fn hit(&self, key: &str, max: u32, window: Duration, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = Window {
            count: 0,
            resets_at: now + window,
        };
        let entry = windows.entry(key.to_string()).or_insert(fresh);
        if now >= entry.resets_at {
            *entry = fresh;
        }
        entry.count = entry.count.saturating_add(1);
        entry.count <= max
    }

    /// Drop counters whose window has closed, returning how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, w| w.resets_at > now);
        before - windows.len()
    }

    pub fn len(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rate limiter backend chosen at startup, alongside the nonce store.
#[derive(Clone)]
pub enum RateLimiter {
    Memory(MemoryRateLimiter),
    Redis(redis::Client),
}

impl RateLimiter {
    pub fn in_memory() -> Self {
        RateLimiter::Memory(MemoryRateLimiter::new())
    }

    /// Count one request against `key`. Returns false once more than
    /// `max` requests arrived within the current `window_secs` window.
    pub async fn check(&self, key: &str, max: u32, window_secs: u64) -> Result<bool, StoreError> {
        match self {
            RateLimiter::Memory(limiter) => Ok(limiter.hit(
                key,
                max,
                Duration::from_secs(window_secs),
                Instant::now(),
            )),
            RateLimiter::Redis(client) => {
                let mut con = client.get_multiplexed_async_connection().await?;
                Ok(check_rate_limit(&mut con, key, max, window_secs).await?)
            }
        }
    }
}

/// Check rate limit using Redis INCR + EXPIRE.
pub async fn check_rate_limit<C>(
    con: &mut C,
    key: &str,
    max: u32,
    window_secs: u64,
) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let count: u32 = con.incr(key, 1).await?;

    // Set TTL on first request
    if count == 1 {
        let ttl = i64::try_from(window_secs).unwrap_or(i64::MAX);
        con.expire::<_, ()>(key, ttl).await?;
    }

    Ok(count <= max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_hit_allows_up_to_max() {
        let limiter = MemoryRateLimiter::new();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.hit("ratelimit:login:10.0.0.1", 3, WINDOW, now));
        }
        assert!(!limiter.hit("ratelimit:login:10.0.0.1", 3, WINDOW, now));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = MemoryRateLimiter::new();
        let now = Instant::now();

        assert!(limiter.hit("ratelimit:login:10.0.0.1", 1, WINDOW, now));
        assert!(!limiter.hit("ratelimit:login:10.0.0.1", 1, WINDOW, now));
        assert!(limiter.hit("ratelimit:login:10.0.0.2", 1, WINDOW, now));
    }

    #[test]
    fn test_window_resets() {
        let limiter = MemoryRateLimiter::new();
        let now = Instant::now();

        assert!(limiter.hit("ratelimit:login:10.0.0.1", 1, WINDOW, now));
        assert!(!limiter.hit("ratelimit:login:10.0.0.1", 1, WINDOW, now + Duration::from_secs(59)));
        assert!(limiter.hit("ratelimit:login:10.0.0.1", 1, WINDOW, now + WINDOW));
    }

    #[test]
    fn test_purge_expired() {
        let limiter = MemoryRateLimiter::new();
        let now = Instant::now();
        limiter.hit("ratelimit:login:10.0.0.1", 5, WINDOW, now);
        limiter.hit("ratelimit:login:10.0.0.2", 5, WINDOW, now + Duration::from_secs(30));

        assert_eq!(limiter.purge_expired(now + WINDOW), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.purge_expired(now + WINDOW * 2), 1);
        assert!(limiter.is_empty());
    }

    #[tokio::test]
    async fn test_check_in_memory() {
        let limiter = RateLimiter::in_memory();
        assert!(limiter.check("ratelimit:login:unit", 2, 60).await.unwrap());
        assert!(limiter.check("ratelimit:login:unit", 2, 60).await.unwrap());
        assert!(!limiter.check("ratelimit:login:unit", 2, 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_rate_limit() {
        // Note: This test requires a running Redis instance
        // Skip if REDIS_URL is not set
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let client = match redis::Client::open(redis_url) {
            Ok(c) => c,
            Err(_) => {
                eprintln!("Skipping test: Redis not available");
                return;
            }
        };

        let mut con = match client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(_) => {
                eprintln!("Skipping test: Redis connection failed");
                return;
            }
        };

        let test_key = "test:ratelimit:login";
        let _: Result<(), _> = con.del(test_key).await;

        assert!(check_rate_limit(&mut con, test_key, 2, 60).await.unwrap());
        assert!(check_rate_limit(&mut con, test_key, 2, 60).await.unwrap());
        assert!(!check_rate_limit(&mut con, test_key, 2, 60).await.unwrap());

        let ttl: i64 = con.ttl(test_key).await.unwrap();
        assert!(ttl > 0 && ttl <= 60);

        let _: Result<(), _> = con.del(test_key).await;
    }
}

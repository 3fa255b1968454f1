//! Issued-nonce tracking with consume-once semantics.
//!
//! A nonce is remembered when its challenge is handed out and removed the
//! first time a login presents it, so each signed challenge can complete at
//! most one login.
//!
//! Redis key pattern (when a Redis URL is configured):
//! - `siwe_nonce:{nonce}`: marker with TTL equal to the challenge window

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Outstanding in-memory nonces allowed when no bound is configured.
pub const DEFAULT_MAX_PENDING_NONCES: usize = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("too many pending challenges")]
    Full,
}

/// Process-local nonce table holding at most `capacity` live entries.
#[derive(Clone)]
pub struct MemoryNonceStore {
    entries: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    capacity: usize,
}

impl Default for MemoryNonceStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_PENDING_NONCES)
    }
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Insert `nonce` unless a live entry already exists.
    ///
    /// A full table is purged of expired entries first; if it is still
    /// full the insert fails with [`StoreError::Full`].
    pub fn insert(
        &self,
        nonce: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.get(nonce).is_some_and(|existing| *existing >= now) {
            return Ok(false);
        }

        if !entries.contains_key(nonce) && entries.len() >= self.capacity {
            entries.retain(|_, live_until| *live_until >= now);
            if entries.len() >= self.capacity {
                return Err(StoreError::Full);
            }
        }

        entries.insert(nonce.to_string(), expires_at);
        Ok(true)
    }

    /// Remove `nonce`; true only if it was present and not yet expired.
    pub fn consume(&self, nonce: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        matches!(entries.remove(nonce), Some(expires_at) if expires_at >= now)
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at >= now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Nonce store backend chosen at startup.
#[derive(Clone)]
pub enum NonceStore {
    Memory(MemoryNonceStore),
    Redis(redis::Client),
}

impl NonceStore {
    pub fn in_memory() -> Self {
        NonceStore::Memory(MemoryNonceStore::new())
    }

    /// Record a freshly issued nonce valid until `expires_at`.
    ///
    /// Returns false if the nonce is already outstanding.
    pub async fn remember(&self, nonce: &str, expires_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let now = Utc::now();
        match self {
            NonceStore::Memory(store) => store.insert(nonce, expires_at, now),
            NonceStore::Redis(client) => {
                let mut con = client.get_multiplexed_async_connection().await?;
                let ttl_secs = (expires_at - now).num_seconds().max(1) as u64;
                Ok(store_nonce(&mut con, nonce, ttl_secs).await?)
            }
        }
    }

    /// Consume a nonce exactly once.
    pub async fn consume(&self, nonce: &str) -> Result<bool, StoreError> {
        match self {
            NonceStore::Memory(store) => Ok(store.consume(nonce, Utc::now())),
            NonceStore::Redis(client) => {
                let mut con = client.get_multiplexed_async_connection().await?;
                Ok(take_nonce(&mut con, nonce).await?)
            }
        }
    }
}

fn nonce_key(nonce: &str) -> String {
    format!("siwe_nonce:{}", nonce)
}

/// Store a nonce marker with TTL, only if absent (`SET NX EX`).
pub async fn store_nonce<C>(con: &mut C, nonce: &str, ttl_secs: u64) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let reply: Option<String> = redis::cmd("SET")
        .arg(nonce_key(nonce))
        .arg(1)
        .arg("NX")
        .arg("EX")
        .arg(ttl_secs)
        .query_async(con)
        .await?;
    Ok(reply.is_some())
}

/// Get and delete a nonce marker atomically.
///
/// Uses a Lua script so two concurrent logins cannot both observe the key.
pub async fn take_nonce<C>(con: &mut C, nonce: &str) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let script = redis::Script::new(
        r"
        local val = redis.call('GET', KEYS[1])
        if val then
            redis.call('DEL', KEYS[1])
        end
        return val
        ",
    );

    let value: Option<String> = script.key(nonce_key(nonce)).invoke_async(con).await?;
    Ok(value.is_some())
}

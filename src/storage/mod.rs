//! Storage layer for issued challenge nonces and request rate counters.
//!
//! Backed by in-process tables or, when configured, Redis.

pub mod nonce;
pub mod rate_limit;

pub use nonce::{MemoryNonceStore, NonceStore, StoreError};
pub use rate_limit::{MemoryRateLimiter, RateLimiter};

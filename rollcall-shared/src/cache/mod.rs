//! Cache-aside layer
//!
//! [`CacheStore`] is the raw key/value contract: string values with a TTL,
//! atomic counters and a health check. Two stores implement it:
//!
//! - [`RedisCacheStore`]: production store on top of [`crate::redis::RedisClient`]
//! - [`MemoryCacheStore`]: process-local store for tests and local runs
//!
//! Application code uses [`CacheHelper`], which adds JSON (de)serialization,
//! default TTLs and the session / API-response key conventions.
//!
//! A missing key is never an error. Errors mean the store itself failed
//! (unreachable, timed out, wrong value type).

use async_trait::async_trait;
use std::time::Duration;

use crate::redis::RedisClientError;

pub mod helper;
pub mod memory;
pub mod redis_store;

pub use helper::{CacheHelper, CacheStats, CachedApiResponse};
pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache key must not be empty")]
    EmptyKey,

    #[error("cache TTL must be positive and at most {} seconds", MAX_TTL.as_secs())]
    InvalidTtl,

    #[error("cache value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `incr_by` hit a value that is not an integer
    #[error("cached value at '{key}' is not an integer counter")]
    NotACounter { key: String },

    #[error("counter at '{key}' would overflow")]
    CounterOverflow { key: String },

    #[error(transparent)]
    Redis(#[from] RedisClientError),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Longest TTL any store accepts (30 days)
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Raw key/value store behind the cache helper
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name, e.g. `"redis"`
    fn backend_name(&self) -> &'static str;

    /// Where the store lives, with credentials removed
    fn location(&self) -> String;

    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores `value`, replacing any previous value and TTL
    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Returns true if a live entry was removed
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Atomically adds `amount` to the integer at `key` and returns the new
    /// value. A missing key starts at 0 and expires after `ttl_on_create`;
    /// an existing counter keeps its TTL.
    async fn incr_by(&self, key: &str, amount: i64, ttl_on_create: Duration) -> CacheResult<i64>;

    /// Remaining lifetime of a live entry
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;

    /// Number of live keys owned by this store
    async fn key_count(&self) -> CacheResult<u64>;

    async fn ping(&self) -> CacheResult<()>;
}

pub(crate) fn check_key(key: &str) -> CacheResult<()> {
    if key.is_empty() {
        Err(CacheError::EmptyKey)
    } else {
        Ok(())
    }
}

pub(crate) fn check_ttl(ttl: Duration) -> CacheResult<()> {
    if ttl.is_zero() || ttl > MAX_TTL {
        Err(CacheError::InvalidTtl)
    } else {
        Ok(())
    }
}

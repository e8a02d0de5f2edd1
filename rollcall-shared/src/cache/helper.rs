//! Cache-aside helper
//!
//! Typed convenience layer over a [`CacheStore`]. Values are stored as JSON so
//! any `Serialize` type round-trips through either backend.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rollcall_shared::cache::{CacheHelper, MemoryCacheStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheHelper::new(Arc::new(MemoryCacheStore::new()), Duration::from_secs(300));
//!
//! cache.set("greeting", &"hello", None).await?;
//! let value: Option<String> = cache.get("greeting").await?;
//! assert_eq!(value.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::{CacheResult, CacheStore};

/// Lifetime of per-account session data
pub const USER_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Lifetime of cached API responses
pub const API_RESPONSE_TTL: Duration = Duration::from_secs(300);

/// Lifetime given to a counter when `increment` creates it
pub const COUNTER_TTL: Duration = Duration::from_secs(3600);

/// Envelope stored by [`CacheHelper::cache_api_response`]
///
/// `expires_at` is informational; the store's TTL decides eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedApiResponse<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Cache backend summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub cache_backend: String,
    pub cache_location: String,
    /// `"Connected"` or `"Error"`
    pub status: String,
    /// Live keys, when the store could count them
    pub key_count: Option<u64>,
}

impl CacheStats {
    pub fn is_connected(&self) -> bool {
        self.status == "Connected"
    }
}

/// Shared cache-aside helper
#[derive(Clone)]
pub struct CacheHelper {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl CacheHelper {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Stores `value` under `key` for `ttl` (or the default TTL)
    ///
    /// Returns `Ok(true)` once stored.
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<bool>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.store
            .set_raw(key, raw, ttl.unwrap_or(self.default_ttl))
            .await?;
        Ok(true)
    }

    /// Returns the value under `key`, or `None` on a miss
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.store.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Returns the value under `key`, or `default` on a miss
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> CacheResult<T> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    /// Removes `key`; `Ok(false)` if it was not there
    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.store.delete(key).await
    }

    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.store.exists(key).await
    }

    /// Atomically adds `amount` to a counter and returns the new total
    ///
    /// A counter created by this call expires after [`COUNTER_TTL`].
    pub async fn increment(&self, key: &str, amount: i64) -> CacheResult<i64> {
        self.store.incr_by(key, amount, COUNTER_TTL).await
    }

    /// Like [`increment`](Self::increment) with an explicit window for new counters
    pub async fn increment_with_ttl(
        &self,
        key: &str,
        amount: i64,
        ttl_on_create: Duration,
    ) -> CacheResult<i64> {
        self.store.incr_by(key, amount, ttl_on_create).await
    }

    /// Remaining lifetime of `key`
    pub async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        self.store.ttl(key).await
    }

    pub fn user_session_key(account_id: Uuid) -> String {
        format!("user_session_{}", account_id)
    }

    /// Stores per-account session data (default TTL one hour)
    pub async fn set_user_session_data<T>(
        &self,
        account_id: Uuid,
        data: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<bool>
    where
        T: Serialize + ?Sized,
    {
        let key = Self::user_session_key(account_id);
        self.set(&key, data, Some(ttl.unwrap_or(USER_SESSION_TTL)))
            .await
    }

    pub async fn get_user_session_data<T: DeserializeOwned>(
        &self,
        account_id: Uuid,
    ) -> CacheResult<Option<T>> {
        self.get(&Self::user_session_key(account_id)).await
    }

    /// Key for a cached endpoint: `api_cache_` + endpoint with `/` as `_`
    pub fn api_cache_key(endpoint: &str) -> String {
        format!("api_cache_{}", endpoint.replace('/', "_"))
    }

    /// Caches a response body for `endpoint` (default TTL five minutes)
    pub async fn cache_api_response<T: Serialize>(
        &self,
        endpoint: &str,
        data: T,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        let ttl = ttl.unwrap_or(API_RESPONSE_TTL);
        let cached_at = Utc::now();
        let expires_at = cached_at
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());

        let envelope = CachedApiResponse {
            data,
            cached_at,
            expires_at,
        };
        self.set(&Self::api_cache_key(endpoint), &envelope, Some(ttl))
            .await
    }

    pub async fn get_cached_api_response<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> CacheResult<Option<CachedApiResponse<T>>> {
        self.get(&Self::api_cache_key(endpoint)).await
    }

    /// Backend summary; never fails, reports `"Error"` instead
    pub async fn stats(&self) -> CacheStats {
        let key_count = match self.store.ping().await {
            Ok(()) => self.store.key_count().await,
            Err(e) => Err(e),
        };

        let (status, key_count) = match key_count {
            Ok(n) => ("Connected", Some(n)),
            Err(e) => {
                warn!(error = %e, backend = self.store.backend_name(), "Cache stats unavailable");
                ("Error", None)
            }
        };

        CacheStats {
            cache_backend: self.store.backend_name().to_string(),
            cache_location: self.store.location(),
            status: status.to_string(),
            key_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCacheStore};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn helper() -> CacheHelper {
        CacheHelper::new(Arc::new(MemoryCacheStore::new()), Duration::from_secs(300))
    }

    /// Store whose every call fails as if Redis were down
    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        fn backend_name(&self) -> &'static str {
            "redis"
        }
        fn location(&self) -> String {
            "redis://unreachable".to_string()
        }
        async fn get_raw(&self, _: &str) -> CacheResult<Option<String>> {
            Err(down())
        }
        async fn set_raw(&self, _: &str, _: String, _: Duration) -> CacheResult<()> {
            Err(down())
        }
        async fn delete(&self, _: &str) -> CacheResult<bool> {
            Err(down())
        }
        async fn exists(&self, _: &str) -> CacheResult<bool> {
            Err(down())
        }
        async fn incr_by(&self, _: &str, _: i64, _: Duration) -> CacheResult<i64> {
            Err(down())
        }
        async fn ttl(&self, _: &str) -> CacheResult<Option<Duration>> {
            Err(down())
        }
        async fn key_count(&self) -> CacheResult<u64> {
            Err(down())
        }
        async fn ping(&self) -> CacheResult<()> {
            Err(down())
        }
    }

    fn down() -> CacheError {
        crate::redis::RedisClientError::ConnectionError("connection refused".to_string()).into()
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = helper();
        assert!(cache.set("k", &json!({"a": 1}), None).await.unwrap());

        let value: Option<Value> = cache.get("k").await.unwrap();
        assert_eq!(value, Some(json!({"a": 1})));

        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
        assert_eq!(
            cache.get_or("k", "fallback".to_string()).await.unwrap(),
            "fallback"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_respects_ttl() {
        let cache = helper();
        cache.set("k", "v", Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(cache.get::<String>("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_millis(1100)).await;
        assert_eq!(cache.get_or("k", "default".to_string()).await.unwrap(), "default");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies() {
        let cache = helper();
        cache.set("k", &1, None).await.unwrap();
        assert_eq!(cache.ttl("k").await.unwrap(), Some(Duration::from_secs(300)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_creates_counter_with_hour_ttl() {
        let cache = helper();
        assert_eq!(cache.increment("visits", 1).await.unwrap(), 1);
        assert_eq!(cache.increment("visits", 4).await.unwrap(), 5);
        assert_eq!(cache.ttl("visits").await.unwrap(), Some(COUNTER_TTL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_session_data() {
        let cache = helper();
        let account_id = Uuid::new_v4();
        cache
            .set_user_session_data(account_id, &json!({"theme": "dark"}), None)
            .await
            .unwrap();

        let key = format!("user_session_{}", account_id);
        assert_eq!(cache.ttl(&key).await.unwrap(), Some(USER_SESSION_TTL));

        let data: Option<Value> = cache.get_user_session_data(account_id).await.unwrap();
        assert_eq!(data, Some(json!({"theme": "dark"})));
    }

    #[tokio::test]
    async fn test_api_response_envelope() {
        let cache = helper();
        cache
            .cache_api_response("/user/summary", json!({"total": 3}), None)
            .await
            .unwrap();

        assert_eq!(CacheHelper::api_cache_key("/user/summary"), "api_cache__user_summary");
        let cached: CachedApiResponse<Value> = cache
            .get_cached_api_response("/user/summary")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.data, json!({"total": 3}));
        assert_eq!(cached.expires_at - cached.cached_at, chrono::Duration::seconds(300));
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let cache = helper();
        assert!(matches!(
            cache.set("", &1, None).await,
            Err(CacheError::EmptyKey)
        ));
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = helper();
        cache.set("a", &1, None).await.unwrap();
        cache.set("b", &2, None).await.unwrap();

        let stats = cache.stats().await;
        assert!(stats.is_connected());
        assert_eq!(stats.cache_backend, "memory");
        assert_eq!(stats.key_count, Some(2));
    }

    #[tokio::test]
    async fn test_unreachable_store_surfaces_errors() {
        let cache = CacheHelper::new(Arc::new(DownStore), Duration::from_secs(300));
        assert!(matches!(cache.get::<Value>("k").await, Err(CacheError::Redis(_))));
        assert!(cache.increment("k", 1).await.is_err());

        let stats = cache.stats().await;
        assert_eq!(stats.status, "Error");
        assert_eq!(stats.key_count, None);
    }
}

//! Redis-backed cache store
//!
//! Every key is namespaced with the configured prefix (`rollcall:` by
//! default), so `key_count` only sees this application's keys even on a
//! shared Redis database.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{check_key, check_ttl, CacheResult, CacheStore};
use crate::redis::RedisClient;

/// Keys fetched per `SCAN` round trip
const SCAN_BATCH: u64 = 500;

/// [`CacheStore`] on top of a shared [`RedisClient`]
#[derive(Clone)]
pub struct RedisCacheStore {
    client: RedisClient,
    key_prefix: String,
}

impl RedisCacheStore {
    pub fn new(client: RedisClient) -> Self {
        let key_prefix = client.config().key_prefix.clone();
        Self { client, key_prefix }
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    fn location(&self) -> String {
        self.client.location()
    }

    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        check_key(key)?;
        let value: Option<String> = self
            .client
            .query(redis::cmd("GET").arg(self.make_key(key)))
            .await?;
        debug!(key, hit = value.is_some(), "cache get");
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        check_key(key)?;
        check_ttl(ttl)?;
        // PX keeps sub-second TTLs intact
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        self.client
            .query::<()>(
                redis::cmd("SET")
                    .arg(self.make_key(key))
                    .arg(value)
                    .arg("PX")
                    .arg(ttl_ms),
            )
            .await?;
        debug!(key, ttl_ms, "cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        check_key(key)?;
        let removed: u64 = self
            .client
            .query(redis::cmd("DEL").arg(self.make_key(key)))
            .await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        check_key(key)?;
        let count: u64 = self
            .client
            .query(redis::cmd("EXISTS").arg(self.make_key(key)))
            .await?;
        Ok(count > 0)
    }

    async fn incr_by(&self, key: &str, amount: i64, ttl_on_create: Duration) -> CacheResult<i64> {
        check_key(key)?;
        check_ttl(ttl_on_create)?;
        let redis_key = self.make_key(key);
        let ttl_secs = ttl_on_create.as_secs().max(1);

        // SET NX creates the counter with its TTL only if it is missing; the
        // transaction makes create-and-increment a single step.
        let (value,): (i64,) = self
            .client
            .query_pipeline(
                redis::pipe()
                    .atomic()
                    .cmd("SET")
                    .arg(&redis_key)
                    .arg(0)
                    .arg("EX")
                    .arg(ttl_secs)
                    .arg("NX")
                    .ignore()
                    .cmd("INCRBY")
                    .arg(&redis_key)
                    .arg(amount),
            )
            .await?;
        Ok(value)
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        check_key(key)?;
        // -2: missing, -1: no expiry
        let ms: i64 = self
            .client
            .query(redis::cmd("PTTL").arg(self.make_key(key)))
            .await?;
        Ok(u64::try_from(ms).ok().map(Duration::from_millis))
    }

    async fn key_count(&self) -> CacheResult<u64> {
        let pattern = format!("{}*", self.key_prefix);
        let mut cursor: u64 = 0;
        let mut total: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = self
                .client
                .query(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH),
                )
                .await?;
            total += keys.len() as u64;
            if next == 0 {
                return Ok(total);
            }
            cursor = next;
        }
    }

    async fn ping(&self) -> CacheResult<()> {
        if self.client.ping().await? {
            Ok(())
        } else {
            Err(crate::redis::RedisClientError::CommandError(
                "PING did not return PONG".to_string(),
            )
            .into())
        }
    }
}

//! Process-local cache store
//!
//! Entries expire lazily: an expired entry is treated as absent and removed
//! the next time it is touched. Expiry uses [`tokio::time::Instant`], so tests
//! running with a paused clock can step past a TTL with `tokio::time::advance`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{check_key, check_ttl, CacheError, CacheResult, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory [`CacheStore`]
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Returns the live entry for `key`, dropping it if it has expired
fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|e| !e.is_live(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn location(&self) -> String {
        "in-process".to_string()
    }

    async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        check_key(key)?;
        let mut entries = self.entries.lock().await;
        Ok(live_entry(&mut entries, key, Instant::now()).map(|e| e.value.clone()))
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        check_key(key)?;
        check_ttl(ttl)?;
        let expires_at = Instant::now().checked_add(ttl).ok_or(CacheError::InvalidTtl)?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        check_key(key)?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        Ok(entries.remove(key).is_some_and(|e| e.is_live(now)))
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        check_key(key)?;
        let mut entries = self.entries.lock().await;
        Ok(live_entry(&mut entries, key, Instant::now()).is_some())
    }

    async fn incr_by(&self, key: &str, amount: i64, ttl_on_create: Duration) -> CacheResult<i64> {
        check_key(key)?;
        check_ttl(ttl_on_create)?;

        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match live_entry(&mut entries, key, now) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| CacheError::NotACounter {
                    key: key.to_string(),
                })?;
                let next = current
                    .checked_add(amount)
                    .ok_or_else(|| CacheError::CounterOverflow {
                        key: key.to_string(),
                    })?;
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                let expires_at = now.checked_add(ttl_on_create).ok_or(CacheError::InvalidTtl)?;
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: amount.to_string(),
                        expires_at,
                    },
                );
                Ok(amount)
            }
        }
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        check_key(key)?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        Ok(live_entry(&mut entries, key, now).map(|e| e.expires_at - now))
    }

    async fn key_count(&self) -> CacheResult<u64> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, e| e.is_live(now));
        Ok(entries.len() as u64)
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

//! moka-backed implementation of the `CacheStore` port.
//!
//! Entries carry their own TTL (agent/metadata entries live an hour, the
//! ledger status snapshot five minutes), enforced through a per-entry
//! `Expiry` policy. Prefix invalidation uses moka's invalidation
//! closures.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

use crate::domain::errors::CacheError;
use crate::domain::models::CacheConfig;
use crate::domain::ports::CacheStore;

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // A rewrite restarts the clock with the new entry's TTL
        Some(entry.ttl)
    }
}

/// In-process TTL cache for registry reads.
pub struct MokaCacheStore {
    cache: Cache<String, Entry>,
}

impl MokaCacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .support_invalidation_closures()
            .build();

        Self { cache }
    }

    /// Number of live entries (approximate, for diagnostics).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.cache
            .insert(key.to_string(), Entry { value, ttl })
            .await;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let prefix = prefix.to_string();
        self.cache
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
            .map(|_| ())
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MokaCacheStore {
        MokaCacheStore::new(&CacheConfig::default())
    }

    #[tokio::test]
    async fn test_set_get_invalidate() {
        let store = store();

        store
            .set("registry:agent:a1", "{}".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get("registry:agent:a1").await.unwrap(),
            Some("{}".to_string())
        );

        store.invalidate("registry:agent:a1").await.unwrap();
        assert_eq!(store.get("registry:agent:a1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_per_entry_ttl_expiry() {
        let store = store();

        store
            .set("registry:status", "{}".into(), Duration::from_millis(50))
            .await
            .unwrap();
        store
            .set("registry:agent:a1", "{}".into(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(store.get("registry:status").await.unwrap(), None);
        assert!(store.get("registry:agent:a1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_prefix() {
        let store = store();
        let ttl = Duration::from_secs(60);

        store
            .set("registry:owner:u1", "[]".into(), ttl)
            .await
            .unwrap();
        store
            .set("registry:owner:u2", "[]".into(), ttl)
            .await
            .unwrap();
        store
            .set("registry:agent:a1", "{}".into(), ttl)
            .await
            .unwrap();

        store.invalidate_prefix("registry:owner:").await.unwrap();

        assert_eq!(store.get("registry:owner:u1").await.unwrap(), None);
        assert_eq!(store.get("registry:owner:u2").await.unwrap(), None);
        assert!(store.get("registry:agent:a1").await.unwrap().is_some());
    }
}

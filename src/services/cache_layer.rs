//! Failure-absorbing cache facade over the `CacheStore` port.
//!
//! Every method degrades instead of failing: getters return `None` on any
//! backend or decode error, mutations return a success flag that callers
//! log but never propagate. A degraded cache makes reads slower, never
//! wrong.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::domain::models::{
    AgentRecord, CacheConfig, ChainStatus, TransactionReceipt,
};
use crate::domain::ports::CacheStore;

/// Cache key namespace, colon-delimited.
pub mod keys {
    use crate::domain::models::extract_cid;

    pub const NAMESPACE: &str = "registry:";
    pub const AGENT_PREFIX: &str = "registry:agent:";
    pub const METADATA_PREFIX: &str = "registry:metadata:";
    pub const OWNER_PREFIX: &str = "registry:owner:";
    pub const TX_PREFIX: &str = "registry:tx:";
    pub const STATUS: &str = "registry:status";

    pub fn agent(agent_id: &str) -> String {
        format!("{AGENT_PREFIX}{agent_id}")
    }

    /// Metadata keys are derived from the bare content identifier, so the
    /// same content is cached once regardless of URI prefix.
    pub fn metadata(uri: &str) -> String {
        format!("{METADATA_PREFIX}{}", extract_cid(uri))
    }

    pub fn owner(owner_id: &str) -> String {
        format!("{OWNER_PREFIX}{owner_id}")
    }

    pub fn transaction(tx_hash: &str) -> String {
        format!("{TX_PREFIX}{tx_hash}")
    }
}

pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
    status_ttl: Duration,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            default_ttl: Duration::from_secs(config.default_ttl_secs),
            status_ttl: Duration::from_secs(config.status_ttl_secs),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "discarding undecodable cache entry");
                    let _ = self.store.invalidate(key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "cache serialization failed");
                return false;
            }
        };
        match self.store.set(key, raw, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "cache write failed");
                false
            }
        }
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        match self.store.invalidate(key).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "cache invalidation failed");
                false
            }
        }
    }

    /// Drop every entry whose key starts with `prefix`.
    pub async fn invalidate_prefix(&self, prefix: &str) -> bool {
        match self.store.invalidate_prefix(prefix).await {
            Ok(()) => true,
            Err(e) => {
                warn!(prefix, error = %e, "cache prefix invalidation failed");
                false
            }
        }
    }

    /// Drop every entry in the registry namespace.
    pub async fn clear_all(&self) -> bool {
        self.invalidate_prefix(keys::NAMESPACE).await
    }

    // Agent records

    pub async fn cached_agent(&self, agent_id: &str) -> Option<AgentRecord> {
        self.get_json(&keys::agent(agent_id)).await
    }

    pub async fn cache_agent(&self, record: &AgentRecord) -> bool {
        self.put_json(&keys::agent(&record.agent_id), record, self.default_ttl)
            .await
    }

    pub async fn invalidate_agent(&self, agent_id: &str) -> bool {
        self.invalidate(&keys::agent(agent_id)).await
    }

    // Owner index

    pub async fn cached_owner_agents(&self, owner_id: &str) -> Option<Vec<AgentRecord>> {
        self.get_json(&keys::owner(owner_id)).await
    }

    pub async fn cache_owner_agents(&self, owner_id: &str, agents: &[AgentRecord]) -> bool {
        self.put_json(&keys::owner(owner_id), &agents, self.default_ttl)
            .await
    }

    pub async fn invalidate_owner(&self, owner_id: &str) -> bool {
        self.invalidate(&keys::owner(owner_id)).await
    }

    // Content-addressed metadata

    pub async fn cached_metadata(&self, uri: &str) -> Option<serde_json::Value> {
        self.get_json(&keys::metadata(uri)).await
    }

    pub async fn cache_metadata(&self, uri: &str, document: &serde_json::Value) -> bool {
        self.put_json(&keys::metadata(uri), document, self.default_ttl)
            .await
    }

    pub async fn invalidate_metadata(&self, uri: &str) -> bool {
        self.invalidate(&keys::metadata(uri)).await
    }

    // Transactions

    pub async fn cached_transaction(&self, tx_hash: &str) -> Option<TransactionReceipt> {
        self.get_json(&keys::transaction(tx_hash)).await
    }

    pub async fn cache_transaction(&self, receipt: &TransactionReceipt) -> bool {
        self.put_json(
            &keys::transaction(&receipt.transaction_hash),
            receipt,
            self.default_ttl,
        )
        .await
    }

    // Ledger status snapshot (short TTL, near-real-time state)

    pub async fn cached_status(&self) -> Option<ChainStatus> {
        self.get_json(keys::STATUS).await
    }

    pub async fn cache_status(&self, status: &ChainStatus) -> bool {
        self.put_json(keys::STATUS, status, self.status_ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::MokaCacheStore;
    use crate::domain::errors::CacheError;
    use async_trait::async_trait;
    use serde_json::json;

    /// A backend that fails every operation, standing in for an
    /// unreachable cache store.
    struct UnreachableStore;

    #[async_trait]
    impl CacheStore for UnreachableStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn invalidate_prefix(&self, _prefix: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
    }

    fn layer() -> CacheLayer {
        let config = CacheConfig::default();
        CacheLayer::new(Arc::new(MokaCacheStore::new(&config)), &config)
    }

    #[tokio::test]
    async fn test_agent_round_trip() {
        let cache = layer();
        let record = AgentRecord::new("a1", "did:x:1", "ipfs://Qm1", "u1", 100);

        assert!(cache.cached_agent("a1").await.is_none());
        assert!(cache.cache_agent(&record).await);
        assert_eq!(cache.cached_agent("a1").await, Some(record));

        assert!(cache.invalidate_agent("a1").await);
        assert!(cache.cached_agent("a1").await.is_none());
    }

    #[tokio::test]
    async fn test_metadata_key_normalization() {
        let cache = layer();
        let doc = json!({"name": "summarizer"});

        cache.cache_metadata("ipfs://Qm1", &doc).await;
        // Bare CID and prefixed URI resolve to the same entry
        assert_eq!(cache.cached_metadata("Qm1").await, Some(doc));

        cache.invalidate_metadata("Qm1").await;
        assert!(cache.cached_metadata("ipfs://Qm1").await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_absorbed() {
        let config = CacheConfig::default();
        let cache = CacheLayer::new(Arc::new(UnreachableStore), &config);
        let record = AgentRecord::new("a1", "did:x:1", "ipfs://Qm1", "u1", 100);

        // Reads miss, writes report failure, nothing panics or errors out
        assert!(cache.cached_agent("a1").await.is_none());
        assert!(!cache.cache_agent(&record).await);
        assert!(!cache.invalidate_agent("a1").await);
        assert!(!cache.clear_all().await);
    }

    #[tokio::test]
    async fn test_clear_all_scopes_to_namespace() {
        let cache = layer();
        let record = AgentRecord::new("a1", "did:x:1", "ipfs://Qm1", "u1", 100);
        cache.cache_agent(&record).await;
        cache.cache_owner_agents("u1", std::slice::from_ref(&record)).await;

        assert!(cache.clear_all().await);
        assert!(cache.cached_agent("a1").await.is_none());
        assert!(cache.cached_owner_agents("u1").await.is_none());
    }
}

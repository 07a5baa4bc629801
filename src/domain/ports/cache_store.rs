use crate::domain::errors::CacheError;
use async_trait::async_trait;
use std::time::Duration;

/// Port for the TTL-bounded key-value cache backend.
///
/// This is the raw, fallible interface; `services::CacheLayer` wraps it
/// and absorbs every error so cache degradation is never fatal to a
/// request.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a serialized payload. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a serialized payload with a per-entry TTL.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove one entry.
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every entry whose key starts with `prefix`.
    async fn invalidate_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

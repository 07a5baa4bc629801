//! Shared helpers for integration tests: an in-memory stack wired the
//! same way the daemon wires production adapters, with the mock ledger
//! in place of the RPC endpoint.
#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use nexus_sync::adapters::cache::MokaCacheStore;
use nexus_sync::adapters::chain::MockChain;
use nexus_sync::adapters::sqlite::{
    create_migrated_test_pool, SqliteAgentStore, SqliteTransactionLedger,
};
use nexus_sync::domain::models::CacheConfig;
use nexus_sync::{CacheLayer, MetadataError, MetadataFetcher, SyncProcessor};

/// Metadata fetcher serving a fixed set of documents; anything else is a
/// gateway miss.
pub struct StaticMetadata {
    documents: HashMap<String, serde_json::Value>,
}

impl StaticMetadata {
    pub fn new(documents: &[(&str, serde_json::Value)]) -> Self {
        Self {
            documents: documents
                .iter()
                .map(|(uri, doc)| ((*uri).to_string(), doc.clone()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }
}

#[async_trait]
impl MetadataFetcher for StaticMetadata {
    async fn fetch(&self, uri: &str) -> Result<serde_json::Value, MetadataError> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or(MetadataError::Gateway(404))
    }
}

pub struct TestStack {
    pub chain: Arc<MockChain>,
    pub agents: Arc<SqliteAgentStore>,
    pub ledger: Arc<SqliteTransactionLedger>,
    pub cache: Arc<CacheLayer>,
    pub processor: Arc<SyncProcessor>,
}

/// Build a full stack over an in-memory database, with the mock ledger
/// starting at `start_block`.
pub async fn build_stack(start_block: u64, metadata: StaticMetadata) -> TestStack {
    let pool = create_migrated_test_pool().await.expect("test pool");
    let chain = Arc::new(MockChain::with_start_block(start_block));
    let agents = Arc::new(SqliteAgentStore::new(pool.clone()));
    let ledger = Arc::new(SqliteTransactionLedger::new(pool));
    let cache_config = CacheConfig::default();
    let cache = Arc::new(CacheLayer::new(
        Arc::new(MokaCacheStore::new(&cache_config)),
        &cache_config,
    ));
    let processor = Arc::new(SyncProcessor::new(
        agents.clone(),
        ledger.clone(),
        cache.clone(),
        Arc::new(metadata),
    ));

    TestStack {
        chain,
        agents,
        ledger,
        cache,
        processor,
    }
}

/// Poll `check` until it returns `Some`, or panic after ~2.5s. Used to
/// wait for the async pipeline to settle without fixed sleeps.
pub async fn wait_for<T, F, Fut>(description: &str, mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..50 {
        if let Some(value) = check().await {
            return value;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for {description}");
}

//! nexus-sync: chain-state synchronization and cache-consistency engine
//! for the agent registry.
//!
//! Agent records live authoritatively on an immutable ledger. This crate
//! mirrors them into a fast read cache and a durable document store
//! through an event-driven replication pipeline that guarantees
//! idempotent replay, monotonic per-record progress and no stale reads
//! after invalidation.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, ports and the error taxonomy
//! - **Service Layer** (`services`): sync processor, event subscriber,
//!   cache layer and the registry read/write surface
//! - **Adapters** (`adapters`): SQLite document store, moka cache,
//!   JSON-RPC chain client, content-address gateway
//! - **Infrastructure** (`infrastructure`): configuration loading
//!
//! # Pipeline
//!
//! A write goes to the chain, gets mined and emits an event; the
//! subscriber replays or receives it, the processor upserts the mirror,
//! invalidates affected cache keys (write-then-invalidate) and appends to
//! the transaction ledger. Reads go cache-first and fall back to the
//! chain or the mirror.

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{
    CacheError, ChainError, MetadataError, RegistryError, StoreError, SyncError, ValidationError,
};
pub use domain::models::{
    AgentRecord, ChainStatus, Config, EventEnvelope, EventType, OnChainAgent, RegistryCall,
    RegistryEvent, TransactionReceipt, TransactionRecord,
};
pub use domain::ports::{AgentStore, CacheStore, ChainClient, MetadataFetcher, TransactionLedger};
pub use adapters::chain::RetryPolicy;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CacheLayer, EventSubscriber, NewAgent, RegistryService, SyncOutcome, SyncProcessor,
};

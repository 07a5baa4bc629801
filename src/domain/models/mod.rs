//! Domain models for the registry sync engine.

pub mod agent_record;
pub mod chain;
pub mod chain_event;
pub mod config;
pub mod transaction_record;

pub use agent_record::{
    extract_cid, is_valid_did, is_valid_ipfs_uri, validate_metadata, AgentRecord,
};
pub use chain::{ChainStatus, OnChainAgent, PendingTransaction, RegistryCall, TransactionReceipt};
pub use chain_event::{EventEnvelope, EventType, RegistryEvent};
pub use config::{
    CacheConfig, ChainConfig, Config, DatabaseConfig, LoggingConfig, MetadataConfig, RetryConfig,
    SyncConfig,
};
pub use transaction_record::{ProcessingError, TransactionRecord};

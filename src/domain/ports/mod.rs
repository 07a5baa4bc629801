//! Ports (trait interfaces) between the domain and its adapters.

pub mod agent_store;
pub mod cache_store;
pub mod chain_client;
pub mod metadata_fetcher;
pub mod transaction_ledger;

pub use agent_store::AgentStore;
pub use cache_store::CacheStore;
pub use chain_client::ChainClient;
pub use metadata_fetcher::MetadataFetcher;
pub use transaction_ledger::TransactionLedger;

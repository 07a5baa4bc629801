//! Error taxonomy for the registry sync engine.
//!
//! Propagation policy: `ChainError` and `ValidationError` surface to the
//! caller of a write/read operation. `CacheError` is absorbed by the cache
//! layer (callers see a miss). `SyncError` is recorded on the transaction
//! ledger and swallowed at the dispatch boundary.

use thiserror::Error;

/// Failures talking to the ledger RPC endpoint or the registry contract.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain client is not configured: {0} is missing")]
    NotConfigured(&'static str),

    /// Transport-level RPC failure (connection refused, reset, timeout).
    /// These are transient and safe to retry.
    #[error("RPC transport error: {0}")]
    Rpc(String),

    /// The endpoint executed the call and returned an error, e.g. a
    /// contract rejection ("agent already exists"). Not retried.
    #[error("RPC endpoint rejected the call: {0}")]
    Endpoint(String),

    #[error("agent {0} not found on chain")]
    AgentNotFound(String),

    #[error("transaction {tx_hash} not confirmed after {waited_ms}ms")]
    ConfirmationTimeout { tx_hash: String, waited_ms: u64 },

    #[error("malformed RPC response: {0}")]
    InvalidResponse(String),
}

impl ChainError {
    /// Whether retrying the same call can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

/// Malformed input caught before anything is submitted to the chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid DID `{0}`: expected did:<method>:<id>")]
    InvalidDid(String),

    #[error("invalid metadata URI `{0}`: expected ipfs://<cid>")]
    InvalidMetadataUri(String),

    #[error("metadata field `{0}` is required")]
    MissingMetadataField(&'static str),

    #[error("metadata must be a JSON object")]
    MetadataNotObject,
}

/// Cache backend failures. Never fatal: the cache layer logs these and
/// returns a miss-equivalent result.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Document store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Off-chain metadata resolution failures. Best-effort: a failed fetch
/// leaves the record's metadata unset, it never aborts the upsert.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid metadata URI `{0}`")]
    InvalidUri(String),

    #[error("gateway transport error: {0}")]
    Transport(String),

    #[error("gateway returned status {0}")]
    Gateway(u16),

    #[error("metadata document is not valid JSON: {0}")]
    Malformed(String),
}

/// Handler-level failure while applying one ledger event. Isolated per
/// event: recorded in the transaction ledger, never propagated to the
/// subscriber loop.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("subscriber is already listening; call stop() first")]
    AlreadyListening,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Errors surfaced by the registry read/write surface.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

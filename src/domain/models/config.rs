use serde::{Deserialize, Serialize};

/// Main configuration for the sync engine.
///
/// All required chain values must be present at startup; validation
/// happens in `infrastructure::config::ConfigLoader`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Ledger RPC and registry contract settings
    #[serde(default)]
    pub chain: ChainConfig,

    /// Document store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Off-chain metadata gateway configuration
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Event subscription configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Retry policy for transient RPC failures
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Ledger RPC endpoint and registry contract settings.
///
/// `rpc_url`, `signing_key` and `contract_address` have no defaults:
/// missing any of them is a fatal startup error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChainConfig {
    #[serde(default)]
    pub rpc_url: String,

    #[serde(default)]
    pub signing_key: String,

    #[serde(default)]
    pub contract_address: String,

    /// Confirmation depth required before a write is reported confirmed
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Upper bound on one transaction's confirmation wait
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,

    /// Interval between event/receipt polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

const fn default_confirmations() -> u64 {
    1
}

const fn default_confirmation_timeout_ms() -> u64 {
    120_000
}

const fn default_poll_interval_ms() -> u64 {
    2_000
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            signing_key: String::new(),
            contract_address: String::new(),
            confirmations: default_confirmations(),
            confirmation_timeout_ms: default_confirmation_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".nexus-sync/registry.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Maximum number of cached entries
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,

    /// TTL for agent, owner-index and metadata entries, in seconds
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// TTL for the ledger status snapshot, in seconds. Shorter because it
    /// reflects near-real-time state.
    #[serde(default = "default_status_ttl_secs")]
    pub status_ttl_secs: u64,
}

const fn default_cache_capacity() -> u64 {
    10_000
}

const fn default_ttl_secs() -> u64 {
    3_600
}

const fn default_status_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_cache_capacity(),
            default_ttl_secs: default_ttl_secs(),
            status_ttl_secs: default_status_ttl_secs(),
        }
    }
}

/// Off-chain metadata gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetadataConfig {
    /// Base URL of the content-address gateway
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_gateway_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_gateway_url() -> String {
    "https://ipfs.io".to_string()
}

const fn default_gateway_timeout_ms() -> u64 {
    10_000
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            request_timeout_ms: default_gateway_timeout_ms(),
        }
    }
}

/// Event subscription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncConfig {
    /// Replay historical events before going live
    #[serde(default)]
    pub historical: bool,

    /// First block of the historical replay window
    #[serde(default)]
    pub from_block: u64,

    /// Per-event-type dispatch queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long stop() waits for in-flight handlers to drain
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

const fn default_queue_capacity() -> usize {
    256
}

const fn default_drain_timeout_ms() -> u64 {
    5_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            historical: false,
            from_block: 0,
            queue_capacity: default_queue_capacity(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Retry policy for transient RPC failures on individual calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff cap; kept at a few seconds so a flapping endpoint does not
    /// stall confirmation waits
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

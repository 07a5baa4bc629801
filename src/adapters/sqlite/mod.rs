//! SQLite adapters for the document store.

pub mod agent_store;
pub mod connection;
pub mod migrations;
pub mod transaction_ledger;

pub use agent_store::SqliteAgentStore;
pub use connection::{create_pool, create_test_pool, ConnectionError};
pub use migrations::{run_migrations, Migration, MigrationError};
pub use transaction_ledger::SqliteTransactionLedger;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::StoreError;
use crate::domain::models::DatabaseConfig;

/// Parse an RFC3339 datetime from a row field.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Parse an optional JSON column.
pub(crate) fn parse_optional_json(
    s: Option<String>,
) -> Result<Option<serde_json::Value>, StoreError> {
    s.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),
}

/// Open the configured pool and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// In-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

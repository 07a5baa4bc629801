//! Embedded schema migrations for the document store.

use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to execute migration {version}: {source}")]
    ExecutionError {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to read schema version: {0}")]
    VersionCheckError(#[source] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

pub fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "agents mirror and transaction ledger",
        sql: include_str!("../../../migrations/001_initial_schema.sql"),
    }]
}

/// Apply any pending embedded migrations to `pool`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, MigrationError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now')),
            description TEXT
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| MigrationError::ExecutionError { version: 0, source: e })?;

    let current: Option<(i64,)> =
        sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_optional(pool)
            .await
            .map_err(MigrationError::VersionCheckError)?;
    let current = current.map(|(v,)| v).unwrap_or(0);

    let pending: Vec<_> = all_migrations()
        .into_iter()
        .filter(|m| m.version > current)
        .collect();

    for migration in &pending {
        sqlx::raw_sql(migration.sql).execute(pool).await.map_err(|e| {
            MigrationError::ExecutionError {
                version: migration.version,
                source: e,
            }
        })?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(pool)
            .await
            .map_err(|e| MigrationError::ExecutionError {
                version: migration.version,
                source: e,
            })?;
    }

    Ok(pending.len())
}

//! SQLite implementation of the `TransactionLedger` port.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::StoreError;
use crate::domain::models::{EventType, ProcessingError, TransactionRecord};
use crate::domain::ports::TransactionLedger;

use super::parse_datetime;

#[derive(Clone)]
pub struct SqliteTransactionLedger {
    pool: SqlitePool,
}

impl SqliteTransactionLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    transaction_hash: String,
    event_type: String,
    block_number: i64,
    data: String,
    timestamp: String,
    processed: i64,
    processing_errors: String,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, StoreError> {
        let event_type = row
            .event_type
            .parse::<EventType>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let processing_errors: Vec<ProcessingError> =
            serde_json::from_str(&row.processing_errors)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(TransactionRecord {
            transaction_hash: row.transaction_hash,
            block_number: row.block_number as u64,
            event_type,
            data: serde_json::from_str(&row.data)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            timestamp: parse_datetime(&row.timestamp)?,
            processed: row.processed != 0,
            processing_errors,
        })
    }
}

#[async_trait]
impl TransactionLedger for SqliteTransactionLedger {
    async fn append(&self, record: &TransactionRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO chain_transactions
               (transaction_hash, event_type, block_number, data, timestamp, processed, processing_errors)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&record.transaction_hash)
        .bind(record.event_type.as_str())
        .bind(record.block_number as i64)
        .bind(serde_json::to_string(&record.data)?)
        .bind(record.timestamp.to_rfc3339())
        .bind(i64::from(record.processed))
        .bind(serde_json::to_string(&record.processing_errors)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get(
        &self,
        transaction_hash: &str,
        event_type: EventType,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        let row: Option<TransactionRow> = sqlx::query_as(
            "SELECT * FROM chain_transactions WHERE transaction_hash = ? AND event_type = ?",
        )
        .bind(transaction_hash)
        .bind(event_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransactionRecord::try_from).transpose()
    }

    async fn mark_processed(
        &self,
        transaction_hash: &str,
        event_type: EventType,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE chain_transactions SET processed = 1 WHERE transaction_hash = ? AND event_type = ?",
        )
        .bind(transaction_hash)
        .bind(event_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_error(
        &self,
        transaction_hash: &str,
        event_type: EventType,
        message: &str,
    ) -> Result<(), StoreError> {
        let Some(record) = self.get(transaction_hash, event_type).await? else {
            return Ok(());
        };

        let mut errors = record.processing_errors;
        errors.push(ProcessingError {
            message: message.to_string(),
            timestamp: Utc::now(),
        });

        sqlx::query(
            "UPDATE chain_transactions SET processing_errors = ? WHERE transaction_hash = ? AND event_type = ?",
        )
        .bind(serde_json::to_string(&errors)?)
        .bind(transaction_hash)
        .bind(event_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_unprocessed(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            "SELECT * FROM chain_transactions WHERE processed = 0 ORDER BY block_number ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionRecord::try_from).collect()
    }

    async fn list_by_agent(&self, agent_id: &str) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"SELECT * FROM chain_transactions
               WHERE json_extract(data, '$.agentId') = ?
               ORDER BY block_number ASC"#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionRecord::try_from).collect()
    }

    async fn list_by_event_type(
        &self,
        event_type: EventType,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            "SELECT * FROM chain_transactions WHERE event_type = ? ORDER BY block_number ASC",
        )
        .bind(event_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionRecord::try_from).collect()
    }
}

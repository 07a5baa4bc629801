use crate::domain::errors::StoreError;
use crate::domain::models::{EventType, TransactionRecord};
use async_trait::async_trait;

/// Port for the durable append-only record of processed ledger
/// transactions. Used as the audit trail and as the resumption point for
/// crash recovery.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Append a record. Idempotent on `(transaction_hash, event_type)`:
    /// returns `false` (not an error) when the record already exists.
    async fn append(&self, record: &TransactionRecord) -> Result<bool, StoreError>;

    /// Get a record by its identity
    async fn get(
        &self,
        transaction_hash: &str,
        event_type: EventType,
    ) -> Result<Option<TransactionRecord>, StoreError>;

    /// Mark a record as successfully processed
    async fn mark_processed(
        &self,
        transaction_hash: &str,
        event_type: EventType,
    ) -> Result<(), StoreError>;

    /// Append a timestamped processing error to a record
    async fn append_error(
        &self,
        transaction_hash: &str,
        event_type: EventType,
        message: &str,
    ) -> Result<(), StoreError>;

    /// Unprocessed records, ordered by block number ascending
    async fn list_unprocessed(&self) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Records touching one agent, ordered by block number ascending
    async fn list_by_agent(&self, agent_id: &str) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Records of one event type, ordered by block number ascending
    async fn list_by_event_type(
        &self,
        event_type: EventType,
    ) -> Result<Vec<TransactionRecord>, StoreError>;
}

use crate::domain::errors::StoreError;
use crate::domain::models::AgentRecord;
use async_trait::async_trait;

/// Port for the document-store collection that mirrors on-chain agent
/// records. Only the sync processor writes here.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Get a record by its agent id
    async fn get(&self, agent_id: &str) -> Result<Option<AgentRecord>, StoreError>;

    /// Insert-or-replace a record. The caller is responsible for the
    /// `last_synced_block` monotonicity guard.
    async fn upsert(&self, record: &AgentRecord) -> Result<(), StoreError>;

    /// List records belonging to one owner
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<AgentRecord>, StoreError>;

    /// Total number of mirrored records
    async fn count(&self) -> Result<i64, StoreError>;
}

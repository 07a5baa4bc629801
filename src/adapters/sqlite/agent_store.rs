//! SQLite implementation of the `AgentStore` port.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::StoreError;
use crate::domain::models::AgentRecord;
use crate::domain::ports::AgentStore;

use super::{parse_datetime, parse_optional_json};

#[derive(Clone)]
pub struct SqliteAgentStore {
    pool: SqlitePool,
}

impl SqliteAgentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    agent_id: String,
    did: String,
    metadata_uri: String,
    owner_id: String,
    active: i64,
    metadata: Option<String>,
    registered_at: String,
    updated_at: String,
    last_synced_block: i64,
}

impl TryFrom<AgentRow> for AgentRecord {
    type Error = StoreError;

    fn try_from(row: AgentRow) -> Result<Self, StoreError> {
        Ok(AgentRecord {
            agent_id: row.agent_id,
            did: row.did,
            metadata_uri: row.metadata_uri,
            owner_id: row.owner_id,
            active: row.active != 0,
            metadata: parse_optional_json(row.metadata)?,
            registered_at: parse_datetime(&row.registered_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            last_synced_block: row.last_synced_block as u64,
        })
    }
}

#[async_trait]
impl AgentStore for SqliteAgentStore {
    async fn get(&self, agent_id: &str) -> Result<Option<AgentRecord>, StoreError> {
        let row: Option<AgentRow> = sqlx::query_as("SELECT * FROM agents WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AgentRecord::try_from).transpose()
    }

    async fn upsert(&self, record: &AgentRecord) -> Result<(), StoreError> {
        let metadata_json = record
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"INSERT INTO agents (agent_id, did, metadata_uri, owner_id, active, metadata,
               registered_at, updated_at, last_synced_block)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(agent_id) DO UPDATE SET
                   did = excluded.did,
                   metadata_uri = excluded.metadata_uri,
                   owner_id = excluded.owner_id,
                   active = excluded.active,
                   metadata = excluded.metadata,
                   registered_at = excluded.registered_at,
                   updated_at = excluded.updated_at,
                   last_synced_block = excluded.last_synced_block"#,
        )
        .bind(&record.agent_id)
        .bind(&record.did)
        .bind(&record.metadata_uri)
        .bind(&record.owner_id)
        .bind(i64::from(record.active))
        .bind(metadata_json)
        .bind(record.registered_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .bind(record.last_synced_block as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<AgentRecord>, StoreError> {
        let rows: Vec<AgentRow> =
            sqlx::query_as("SELECT * FROM agents WHERE owner_id = ? ORDER BY agent_id")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(AgentRecord::try_from).collect()
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let pool = create_migrated_test_pool().await.expect("test pool");
        let store = SqliteAgentStore::new(pool);

        let mut record = AgentRecord::new("a1", "did:x:1", "ipfs://Qm1", "u1", 100);
        store.upsert(&record).await.unwrap();

        let fetched = store.get("a1").await.unwrap().unwrap();
        assert_eq!(fetched.did, "did:x:1");
        assert_eq!(fetched.last_synced_block, 100);
        assert!(fetched.active);
        assert!(fetched.metadata.is_none());

        // Second upsert replaces fields
        record.metadata_uri = "ipfs://Qm2".into();
        record.metadata = Some(json!({"name": "agent one"}));
        record.last_synced_block = 120;
        store.upsert(&record).await.unwrap();

        let fetched = store.get("a1").await.unwrap().unwrap();
        assert_eq!(fetched.metadata_uri, "ipfs://Qm2");
        assert_eq!(fetched.metadata, Some(json!({"name": "agent one"})));
        assert_eq!(fetched.last_synced_block, 120);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let pool = create_migrated_test_pool().await.expect("test pool");
        let store = SqliteAgentStore::new(pool);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let pool = create_migrated_test_pool().await.expect("test pool");
        let store = SqliteAgentStore::new(pool);

        store
            .upsert(&AgentRecord::new("a2", "did:x:2", "ipfs://Qm2", "u1", 1))
            .await
            .unwrap();
        store
            .upsert(&AgentRecord::new("a1", "did:x:1", "ipfs://Qm1", "u1", 1))
            .await
            .unwrap();
        store
            .upsert(&AgentRecord::new("b1", "did:x:3", "ipfs://Qm3", "u2", 1))
            .await
            .unwrap();

        let owned = store.list_by_owner("u1").await.unwrap();
        assert_eq!(
            owned.iter().map(|r| r.agent_id.as_str()).collect::<Vec<_>>(),
            vec!["a1", "a2"]
        );
    }
}

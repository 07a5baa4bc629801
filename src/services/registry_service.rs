//! Validated write and read-through read surface over the registry.
//!
//! Writes never touch the document store directly: they go to the chain,
//! wait for confirmation, and let the event pipeline bring the mirror up
//! to date. A failed write surfaces a `ChainError` or `ValidationError`,
//! never a partial success.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{ChainError, RegistryError, ValidationError};
use crate::domain::models::{
    is_valid_did, is_valid_ipfs_uri, AgentRecord, ChainStatus, OnChainAgent, RegistryCall,
    TransactionReceipt,
};
use crate::domain::ports::{AgentStore, ChainClient};

use super::cache_layer::CacheLayer;

/// Input for a new registration.
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub agent_id: String,
    pub did: String,
    pub metadata_uri: String,
    pub owner_id: String,
}

pub struct RegistryService {
    chain: Arc<dyn ChainClient>,
    agents: Arc<dyn AgentStore>,
    cache: Arc<CacheLayer>,
    confirmations: u64,
}

impl RegistryService {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        agents: Arc<dyn AgentStore>,
        cache: Arc<CacheLayer>,
        confirmations: u64,
    ) -> Self {
        Self {
            chain,
            agents,
            cache,
            confirmations,
        }
    }

    fn validate_new(new: &NewAgent) -> Result<(), ValidationError> {
        if new.agent_id.is_empty() {
            return Err(ValidationError::MissingField("agent_id"));
        }
        if new.did.is_empty() {
            return Err(ValidationError::MissingField("did"));
        }
        if new.metadata_uri.is_empty() {
            return Err(ValidationError::MissingField("metadata_uri"));
        }
        if new.owner_id.is_empty() {
            return Err(ValidationError::MissingField("owner_id"));
        }
        if !is_valid_did(&new.did) {
            return Err(ValidationError::InvalidDid(new.did.clone()));
        }
        if !is_valid_ipfs_uri(&new.metadata_uri) {
            return Err(ValidationError::InvalidMetadataUri(new.metadata_uri.clone()));
        }
        Ok(())
    }

    async fn submit_and_confirm(
        &self,
        call: RegistryCall,
    ) -> Result<TransactionReceipt, RegistryError> {
        let agent_id = call.agent_id().to_string();
        let pending = self.chain.submit(call).await?;
        debug!(%agent_id, tx_hash = %pending.transaction_hash, "transaction submitted");

        let receipt = self
            .chain
            .wait_for_confirmation(&pending.transaction_hash, self.confirmations)
            .await?;

        self.cache.cache_transaction(&receipt).await;
        Ok(receipt)
    }

    /// Publish a new agent to the registry.
    pub async fn register(&self, new: NewAgent) -> Result<TransactionReceipt, RegistryError> {
        Self::validate_new(&new)?;

        let owner_id = new.owner_id.clone();
        let receipt = self
            .submit_and_confirm(RegistryCall::Register {
                agent_id: new.agent_id,
                did: new.did,
                metadata_uri: new.metadata_uri,
                owner_id: new.owner_id,
            })
            .await?;

        self.cache.invalidate_owner(&owner_id).await;
        Ok(receipt)
    }

    /// Point an agent at a new metadata document.
    pub async fn update(
        &self,
        agent_id: &str,
        metadata_uri: &str,
    ) -> Result<TransactionReceipt, RegistryError> {
        if agent_id.is_empty() {
            return Err(ValidationError::MissingField("agent_id").into());
        }
        if metadata_uri.is_empty() {
            return Err(ValidationError::MissingField("metadata_uri").into());
        }
        if !is_valid_ipfs_uri(metadata_uri) {
            return Err(ValidationError::InvalidMetadataUri(metadata_uri.to_string()).into());
        }

        let receipt = self
            .submit_and_confirm(RegistryCall::Update {
                agent_id: agent_id.to_string(),
                metadata_uri: metadata_uri.to_string(),
            })
            .await?;

        self.cache.invalidate_agent(agent_id).await;
        Ok(receipt)
    }

    /// Deactivate an agent on the registry.
    pub async fn deactivate(&self, agent_id: &str) -> Result<TransactionReceipt, RegistryError> {
        if agent_id.is_empty() {
            return Err(ValidationError::MissingField("agent_id").into());
        }

        let receipt = self
            .submit_and_confirm(RegistryCall::Deactivate {
                agent_id: agent_id.to_string(),
            })
            .await?;

        self.cache.invalidate_agent(agent_id).await;
        self.invalidate_owner_of(agent_id).await;
        Ok(receipt)
    }

    /// Reactivate a previously deactivated agent.
    pub async fn reactivate(&self, agent_id: &str) -> Result<TransactionReceipt, RegistryError> {
        if agent_id.is_empty() {
            return Err(ValidationError::MissingField("agent_id").into());
        }

        let receipt = self
            .submit_and_confirm(RegistryCall::Reactivate {
                agent_id: agent_id.to_string(),
            })
            .await?;

        self.cache.invalidate_agent(agent_id).await;
        self.invalidate_owner_of(agent_id).await;
        Ok(receipt)
    }

    /// Transfer an agent to a new owner. The sync handler invalidates
    /// both owner indexes once the event lands.
    pub async fn transfer_ownership(
        &self,
        agent_id: &str,
        new_owner_id: &str,
    ) -> Result<TransactionReceipt, RegistryError> {
        if agent_id.is_empty() {
            return Err(ValidationError::MissingField("agent_id").into());
        }
        if new_owner_id.is_empty() {
            return Err(ValidationError::MissingField("new_owner_id").into());
        }

        let receipt = self
            .submit_and_confirm(RegistryCall::TransferOwnership {
                agent_id: agent_id.to_string(),
                new_owner_id: new_owner_id.to_string(),
            })
            .await?;

        self.cache.invalidate_agent(agent_id).await;
        self.cache.invalidate_owner(new_owner_id).await;
        Ok(receipt)
    }

    /// Best-effort owner-index invalidation via a chain lookup.
    async fn invalidate_owner_of(&self, agent_id: &str) {
        match self.chain.get_agent(agent_id).await {
            Ok(Some(agent)) => {
                self.cache.invalidate_owner(&agent.owner_id).await;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(agent_id, error = %e, "could not resolve owner for cache invalidation");
            }
        }
    }

    /// Verify an agent against the authoritative chain state,
    /// read-through cached.
    pub async fn verify(&self, agent_id: &str) -> Result<AgentRecord, RegistryError> {
        if let Some(record) = self.cache.cached_agent(agent_id).await {
            debug!(agent_id, "verified from cache");
            return Ok(record);
        }

        let agent = self
            .chain
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| ChainError::AgentNotFound(agent_id.to_string()))?;

        let record = chain_agent_to_record(agent);
        self.cache.cache_agent(&record).await;
        Ok(record)
    }

    /// All agents registered to one owner, read-through cached.
    /// Individual lookup failures are skipped, not fatal.
    pub async fn owner_agents(&self, owner_id: &str) -> Result<Vec<AgentRecord>, RegistryError> {
        if let Some(agents) = self.cache.cached_owner_agents(owner_id).await {
            debug!(owner_id, "owner agents from cache");
            return Ok(agents);
        }

        let agent_ids = self.chain.get_owner_agents(owner_id).await?;

        let mut agents = Vec::with_capacity(agent_ids.len());
        for agent_id in &agent_ids {
            match self.verify(agent_id).await {
                Ok(record) => agents.push(record),
                Err(e) => {
                    warn!(%agent_id, error = %e, "skipping unresolvable agent");
                }
            }
        }

        self.cache.cache_owner_agents(owner_id, &agents).await;
        Ok(agents)
    }

    /// Whether `owner_id` owns `agent_id` on chain. Missing agents are
    /// simply not owned.
    pub async fn verify_ownership(
        &self,
        agent_id: &str,
        owner_id: &str,
    ) -> Result<bool, RegistryError> {
        match self.verify(agent_id).await {
            Ok(record) => Ok(record.owner_id == owner_id),
            Err(RegistryError::Chain(ChainError::AgentNotFound(_))) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The mirrored document-store record, read-through cached. Unlike
    /// `verify`, this does not touch the chain.
    pub async fn record(&self, agent_id: &str) -> Result<Option<AgentRecord>, RegistryError> {
        if let Some(record) = self.cache.cached_agent(agent_id).await {
            return Ok(Some(record));
        }

        let record = self.agents.get(agent_id).await?;
        if let Some(record) = &record {
            self.cache.cache_agent(record).await;
        }
        Ok(record)
    }

    /// Ledger status snapshot, cached with the short TTL.
    pub async fn status(&self) -> Result<ChainStatus, RegistryError> {
        if let Some(status) = self.cache.cached_status().await {
            return Ok(status);
        }

        let status = self.chain.status().await?;
        self.cache.cache_status(&status).await;
        Ok(status)
    }
}

fn chain_agent_to_record(agent: OnChainAgent) -> AgentRecord {
    AgentRecord {
        agent_id: agent.agent_id,
        did: agent.did,
        metadata_uri: agent.metadata_uri,
        owner_id: agent.owner_id,
        active: agent.active,
        metadata: None,
        registered_at: agent.registered_at,
        updated_at: agent.updated_at,
        last_synced_block: 0,
    }
}

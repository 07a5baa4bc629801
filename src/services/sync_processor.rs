//! Per-event-type handlers that turn ledger events into idempotent
//! document-store upserts, cache invalidation and ledger audit records.
//!
//! The dispatch table is fixed at construction: one handler per event
//! type, selected by a single match. Handlers are isolated; a failure is
//! recorded on the transaction ledger and swallowed at the dispatch
//! boundary, so one bad event never halts the subscriber.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::errors::SyncError;
use crate::domain::models::{
    is_valid_ipfs_uri, validate_metadata, AgentRecord, EventEnvelope, RegistryEvent,
    TransactionRecord,
};
use crate::domain::ports::{AgentStore, MetadataFetcher, TransactionLedger};

use super::cache_layer::CacheLayer;

/// What processing one envelope did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The event was applied to the document store.
    Applied,
    /// The `(transaction_hash, event_type)` identity was already
    /// processed; nothing to do.
    Duplicate,
    /// The event's block is at or below the record's sync point and was
    /// ignored for replay safety.
    Stale,
}

pub struct SyncProcessor {
    agents: Arc<dyn AgentStore>,
    ledger: Arc<dyn TransactionLedger>,
    cache: Arc<CacheLayer>,
    metadata: Arc<dyn MetadataFetcher>,
}

impl SyncProcessor {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        ledger: Arc<dyn TransactionLedger>,
        cache: Arc<CacheLayer>,
        metadata: Arc<dyn MetadataFetcher>,
    ) -> Self {
        Self {
            agents,
            ledger,
            cache,
            metadata,
        }
    }

    /// Process one event end-to-end: dedup against the ledger, apply the
    /// matching handler, record the outcome. Errors are recorded in the
    /// ledger entry's `processing_errors` and returned; the entry stays
    /// unprocessed so `recover()` can retry it.
    pub async fn process(&self, envelope: &EventEnvelope) -> Result<SyncOutcome, SyncError> {
        let (tx_hash, event_type) = envelope.identity();

        match self.ledger.get(tx_hash, event_type).await? {
            Some(existing) if existing.processed => {
                debug!(tx_hash, %event_type, "event already processed, skipping");
                return Ok(SyncOutcome::Duplicate);
            }
            Some(_) => {
                // Known but unprocessed: a previous attempt failed, retry
            }
            None => {
                self.ledger
                    .append(&TransactionRecord::from_envelope(envelope))
                    .await?;
            }
        }

        let result = match &envelope.event {
            RegistryEvent::AgentRegistered {
                agent_id,
                did,
                metadata_uri,
                owner_id,
            } => {
                self.handle_registered(envelope, agent_id, did, metadata_uri, owner_id)
                    .await
            }
            RegistryEvent::AgentUpdated {
                agent_id,
                metadata_uri,
            } => self.handle_updated(envelope, agent_id, metadata_uri).await,
            RegistryEvent::AgentDeactivated { agent_id } => {
                self.handle_activation(envelope, agent_id, false).await
            }
            RegistryEvent::AgentReactivated { agent_id } => {
                self.handle_activation(envelope, agent_id, true).await
            }
            RegistryEvent::OwnershipTransferred {
                agent_id,
                old_owner_id,
                new_owner_id,
            } => {
                self.handle_transferred(envelope, agent_id, old_owner_id, new_owner_id)
                    .await
            }
        };

        match result {
            Ok(outcome) => {
                self.ledger.mark_processed(tx_hash, event_type).await?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(ledger_err) = self
                    .ledger
                    .append_error(tx_hash, event_type, &err.to_string())
                    .await
                {
                    warn!(tx_hash, error = %ledger_err, "failed to record processing error");
                }
                Err(err)
            }
        }
    }

    /// Dispatch-boundary wrapper: logs the outcome and swallows handler
    /// failures so the subscriber keeps running.
    pub async fn dispatch(&self, envelope: &EventEnvelope) {
        let (tx_hash, event_type) = envelope.identity();
        match self.process(envelope).await {
            Ok(SyncOutcome::Applied) => {
                info!(
                    tx_hash,
                    %event_type,
                    block = envelope.block_number,
                    agent_id = envelope.event.agent_id(),
                    "event applied"
                );
            }
            Ok(SyncOutcome::Duplicate) => {
                debug!(tx_hash, %event_type, "duplicate event skipped");
            }
            Ok(SyncOutcome::Stale) => {
                debug!(
                    tx_hash,
                    %event_type,
                    block = envelope.block_number,
                    "stale event ignored"
                );
            }
            Err(err) => {
                warn!(tx_hash, %event_type, error = %err, "event processing failed");
            }
        }
    }

    /// Re-drive every unprocessed ledger entry in block order. Called on
    /// startup before the live subscription resumes.
    pub async fn recover(&self) -> Result<usize, SyncError> {
        let pending = self.ledger.list_unprocessed().await?;
        let count = pending.len();

        for record in pending {
            match record.to_envelope() {
                Ok(envelope) => self.dispatch(&envelope).await,
                Err(e) => {
                    warn!(
                        tx_hash = %record.transaction_hash,
                        error = %e,
                        "cannot rebuild event from ledger record"
                    );
                }
            }
        }

        Ok(count)
    }

    /// Best-effort metadata resolution through the cache and the gateway.
    /// Failure leaves the field unset, it never aborts the upsert.
    async fn resolve_metadata(&self, metadata_uri: &str) -> Option<serde_json::Value> {
        if !is_valid_ipfs_uri(metadata_uri) {
            warn!(metadata_uri, "skipping metadata with non-content-addressed URI");
            return None;
        }

        if let Some(document) = self.cache.cached_metadata(metadata_uri).await {
            return Some(document);
        }

        match self.metadata.fetch(metadata_uri).await {
            Ok(document) => {
                if let Err(e) = validate_metadata(&document) {
                    warn!(metadata_uri, error = %e, "fetched metadata fails schema validation");
                    return None;
                }
                self.cache.cache_metadata(metadata_uri, &document).await;
                Some(document)
            }
            Err(e) => {
                warn!(metadata_uri, error = %e, "metadata fetch failed, leaving field unset");
                None
            }
        }
    }

    async fn handle_registered(
        &self,
        envelope: &EventEnvelope,
        agent_id: &str,
        did: &str,
        metadata_uri: &str,
        owner_id: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let existing = self.agents.get(agent_id).await?;
        if let Some(record) = &existing {
            if record.is_stale_event(envelope.block_number) {
                return Ok(SyncOutcome::Stale);
            }
        }

        let metadata = self.resolve_metadata(metadata_uri).await;

        let record = match existing {
            Some(mut record) => {
                record.did = did.to_string();
                record.metadata_uri = metadata_uri.to_string();
                record.owner_id = owner_id.to_string();
                record.active = true;
                record.metadata = metadata;
                record.updated_at = chrono::Utc::now();
                record.last_synced_block = envelope.block_number;
                record
            }
            None => {
                let mut record =
                    AgentRecord::new(agent_id, did, metadata_uri, owner_id, envelope.block_number);
                record.metadata = metadata;
                record
            }
        };

        self.agents.upsert(&record).await?;

        // Write-then-invalidate: the authoritative write landed above, so
        // a concurrent reader can only repopulate with fresh data.
        self.cache.invalidate_agent(agent_id).await;
        self.cache.invalidate_owner(owner_id).await;

        Ok(SyncOutcome::Applied)
    }

    async fn handle_updated(
        &self,
        envelope: &EventEnvelope,
        agent_id: &str,
        metadata_uri: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let existing = self.agents.get(agent_id).await?;
        if let Some(record) = &existing {
            if record.is_stale_event(envelope.block_number) {
                return Ok(SyncOutcome::Stale);
            }
        }

        let metadata = self.resolve_metadata(metadata_uri).await;

        let mut record = existing
            .unwrap_or_else(|| AgentRecord::stub(agent_id, envelope.block_number));
        record.metadata_uri = metadata_uri.to_string();
        record.metadata = metadata;
        record.updated_at = chrono::Utc::now();
        record.last_synced_block = envelope.block_number;

        self.agents.upsert(&record).await?;
        self.cache.invalidate_agent(agent_id).await;

        Ok(SyncOutcome::Applied)
    }

    async fn handle_activation(
        &self,
        envelope: &EventEnvelope,
        agent_id: &str,
        active: bool,
    ) -> Result<SyncOutcome, SyncError> {
        let existing = self.agents.get(agent_id).await?;
        if let Some(record) = &existing {
            if record.is_stale_event(envelope.block_number) {
                return Ok(SyncOutcome::Stale);
            }
        }

        let mut record = existing
            .unwrap_or_else(|| AgentRecord::stub(agent_id, envelope.block_number));
        record.active = active;
        record.updated_at = chrono::Utc::now();
        record.last_synced_block = envelope.block_number;
        let owner_id = record.owner_id.clone();

        self.agents.upsert(&record).await?;

        self.cache.invalidate_agent(agent_id).await;
        if !owner_id.is_empty() {
            self.cache.invalidate_owner(&owner_id).await;
        }

        Ok(SyncOutcome::Applied)
    }

    async fn handle_transferred(
        &self,
        envelope: &EventEnvelope,
        agent_id: &str,
        old_owner_id: &str,
        new_owner_id: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let existing = self.agents.get(agent_id).await?;
        if let Some(record) = &existing {
            if record.is_stale_event(envelope.block_number) {
                return Ok(SyncOutcome::Stale);
            }
        }

        let mut record = existing
            .unwrap_or_else(|| AgentRecord::stub(agent_id, envelope.block_number));
        record.owner_id = new_owner_id.to_string();
        record.updated_at = chrono::Utc::now();
        record.last_synced_block = envelope.block_number;

        self.agents.upsert(&record).await?;

        // Both owner indexes are wrong after a transfer
        self.cache.invalidate_agent(agent_id).await;
        self.cache.invalidate_owner(old_owner_id).await;
        self.cache.invalidate_owner(new_owner_id).await;

        Ok(SyncOutcome::Applied)
    }
}

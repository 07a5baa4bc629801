//! Agent records mirrored from the on-chain registry.
//!
//! Records are owned by the document store and mutated only by the sync
//! processor in response to ledger events. API writes go to the chain
//! first; the mirror catches up through the event pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::ValidationError;

/// Off-chain mirror of one on-chain agent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    /// Stable external identifier, assigned at registration.
    pub agent_id: String,

    /// Decentralized identifier, `did:<method>:<id>`.
    pub did: String,

    /// Content-address pointer to the metadata document, `ipfs://<cid>`.
    pub metadata_uri: String,

    /// Identifier of the owning account.
    pub owner_id: String,

    /// Whether the agent is currently active on chain.
    pub active: bool,

    /// Resolved metadata document. Best-effort: `None` when the fetch
    /// failed or has not happened yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    pub registered_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Highest block number whose event has been applied to this record.
    /// Only ever increases; events at or below it are ignored.
    #[serde(default)]
    pub last_synced_block: u64,
}

impl AgentRecord {
    /// Create a freshly registered record.
    pub fn new(
        agent_id: impl Into<String>,
        did: impl Into<String>,
        metadata_uri: impl Into<String>,
        owner_id: impl Into<String>,
        block_number: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.into(),
            did: did.into(),
            metadata_uri: metadata_uri.into(),
            owner_id: owner_id.into(),
            active: true,
            metadata: None,
            registered_at: now,
            updated_at: now,
            last_synced_block: block_number,
        }
    }

    /// Placeholder record for an agent whose registration event has not
    /// been observed yet (cross-type ordering is not guaranteed). Later
    /// events fill in the missing fields.
    pub fn stub(agent_id: impl Into<String>, block_number: u64) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.into(),
            did: String::new(),
            metadata_uri: String::new(),
            owner_id: String::new(),
            active: true,
            metadata: None,
            registered_at: now,
            updated_at: now,
            last_synced_block: block_number,
        }
    }

    /// Whether an event at `block_number` is older than this record's
    /// sync point and must be ignored.
    pub fn is_stale_event(&self, block_number: u64) -> bool {
        block_number <= self.last_synced_block
    }
}

/// Check a `did:<method>:<id>` identifier.
pub fn is_valid_did(did: &str) -> bool {
    let mut parts = did.splitn(3, ':');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some("did"), Some(method), Some(id))
            if !method.is_empty()
                && method.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                && !id.is_empty()
    )
}

/// Check an `ipfs://<cid>` content-address URI.
pub fn is_valid_ipfs_uri(uri: &str) -> bool {
    match uri.strip_prefix("ipfs://") {
        Some(cid) => !cid.is_empty() && cid.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

/// Normalize a content-address URI to its bare content identifier, so the
/// same content maps to one cache key regardless of URI prefix.
pub fn extract_cid(uri: &str) -> &str {
    uri.strip_prefix("ipfs://").unwrap_or(uri)
}

/// Validate a metadata document against the registry schema: `name`,
/// `description`, `version` and `type` are required string fields, all
/// other fields are preserved as-is.
pub fn validate_metadata(document: &serde_json::Value) -> Result<(), ValidationError> {
    let object = document
        .as_object()
        .ok_or(ValidationError::MetadataNotObject)?;

    for field in ["name", "description", "version", "type"] {
        match object.get(field) {
            Some(value) if value.is_string() => {}
            _ => return Err(ValidationError::MissingMetadataField(field)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_did_validation() {
        assert!(is_valid_did("did:nexus:agent-1"));
        assert!(is_valid_did("did:web:example.com"));
        assert!(!is_valid_did("did:nexus:"));
        assert!(!is_valid_did("did::abc"));
        assert!(!is_valid_did("nexus:abc"));
        assert!(!is_valid_did("did:NEXUS:abc"));
        assert!(!is_valid_did(""));
    }

    #[test]
    fn test_ipfs_uri_validation() {
        assert!(is_valid_ipfs_uri("ipfs://QmYwAPJzv5CZsnAzt8auVZRn"));
        assert!(!is_valid_ipfs_uri("ipfs://"));
        assert!(!is_valid_ipfs_uri("https://ipfs.io/QmYwAPJzv5"));
        assert!(!is_valid_ipfs_uri("ipfs://Qm/../../etc"));
    }

    #[test]
    fn test_extract_cid() {
        assert_eq!(extract_cid("ipfs://Qm1"), "Qm1");
        assert_eq!(extract_cid("Qm1"), "Qm1");
    }

    #[test]
    fn test_stale_event_guard() {
        let record = AgentRecord::new("a1", "did:x:1", "ipfs://Qm1", "u1", 100);
        assert!(record.is_stale_event(99));
        assert!(record.is_stale_event(100));
        assert!(!record.is_stale_event(101));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = AgentRecord::new("a1", "did:x:1", "ipfs://Qm1", "u1", 100);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["agentId"], "a1");
        assert_eq!(value["metadataUri"], "ipfs://Qm1");
        assert_eq!(value["lastSyncedBlock"], 100);
    }

    #[test]
    fn test_metadata_validation() {
        let valid = json!({
            "name": "summarizer",
            "description": "Summarizes documents",
            "version": "1.0.0",
            "type": "assistant",
            "tags": ["nlp"]
        });
        assert!(validate_metadata(&valid).is_ok());

        let missing = json!({ "name": "summarizer" });
        assert_eq!(
            validate_metadata(&missing),
            Err(ValidationError::MissingMetadataField("description"))
        );

        assert_eq!(
            validate_metadata(&json!([1, 2])),
            Err(ValidationError::MetadataNotObject)
        );
    }
}

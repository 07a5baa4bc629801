//! Durable audit records of processed ledger transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chain_event::{EventEnvelope, EventType};

/// One recorded processing failure for a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingError {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only record of a ledger transaction observed by the sync
/// pipeline. Records with `processed = false` are candidates for retry on
/// the next recovery pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_hash: String,
    pub block_number: u64,
    pub event_type: EventType,
    /// Decoded event arguments.
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub processed: bool,
    /// Ordered history of handler failures for this transaction.
    #[serde(default)]
    pub processing_errors: Vec<ProcessingError>,
}

impl TransactionRecord {
    /// Build the unprocessed ledger entry for a freshly observed event.
    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        Self {
            transaction_hash: envelope.transaction_hash.clone(),
            block_number: envelope.block_number,
            event_type: envelope.event.event_type(),
            data: envelope.event.payload(),
            timestamp: Utc::now(),
            processed: false,
            processing_errors: Vec::new(),
        }
    }

    /// Rebuild the event envelope this record was created from, for
    /// re-driving unprocessed entries after a crash.
    pub fn to_envelope(&self) -> Result<EventEnvelope, serde_json::Error> {
        let event = super::chain_event::RegistryEvent::from_parts(
            self.event_type,
            self.data.clone(),
        )?;
        Ok(EventEnvelope {
            transaction_hash: self.transaction_hash.clone(),
            block_number: self.block_number,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::chain_event::RegistryEvent;

    #[test]
    fn test_envelope_round_trip() {
        let envelope = EventEnvelope {
            transaction_hash: "0xfeed".into(),
            block_number: 42,
            event: RegistryEvent::OwnershipTransferred {
                agent_id: "a1".into(),
                old_owner_id: "u1".into(),
                new_owner_id: "u2".into(),
            },
        };

        let record = TransactionRecord::from_envelope(&envelope);
        assert_eq!(record.event_type, EventType::OwnershipTransferred);
        assert!(!record.processed);
        assert_eq!(record.data["newOwnerId"], "u2");

        let rebuilt = record.to_envelope().unwrap();
        assert_eq!(rebuilt, envelope);
    }
}

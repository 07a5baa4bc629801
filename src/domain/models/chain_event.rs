//! Registry contract events as delivered by the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five event types emitted by the registry contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "AgentRegistered")]
    Registered,
    #[serde(rename = "AgentUpdated")]
    Updated,
    #[serde(rename = "AgentDeactivated")]
    Deactivated,
    #[serde(rename = "AgentReactivated")]
    Reactivated,
    OwnershipTransferred,
}

impl EventType {
    /// All event types, in a fixed order used for historical scans.
    pub const ALL: [EventType; 5] = [
        EventType::Registered,
        EventType::Updated,
        EventType::Deactivated,
        EventType::Reactivated,
        EventType::OwnershipTransferred,
    ];

    /// On-wire event name as emitted by the contract.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "AgentRegistered",
            Self::Updated => "AgentUpdated",
            Self::Deactivated => "AgentDeactivated",
            Self::Reactivated => "AgentReactivated",
            Self::OwnershipTransferred => "OwnershipTransferred",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AgentRegistered" => Ok(Self::Registered),
            "AgentUpdated" => Ok(Self::Updated),
            "AgentDeactivated" => Ok(Self::Deactivated),
            "AgentReactivated" => Ok(Self::Reactivated),
            "OwnershipTransferred" => Ok(Self::OwnershipTransferred),
            _ => Err(anyhow::anyhow!("unknown event type: {s}")),
        }
    }
}

/// Decoded registry event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RegistryEvent {
    AgentRegistered {
        #[serde(rename = "agentId")]
        agent_id: String,
        did: String,
        #[serde(rename = "metadataUri")]
        metadata_uri: String,
        #[serde(rename = "ownerId")]
        owner_id: String,
    },
    AgentUpdated {
        #[serde(rename = "agentId")]
        agent_id: String,
        #[serde(rename = "metadataUri")]
        metadata_uri: String,
    },
    AgentDeactivated {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
    AgentReactivated {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
    OwnershipTransferred {
        #[serde(rename = "agentId")]
        agent_id: String,
        #[serde(rename = "oldOwnerId")]
        old_owner_id: String,
        #[serde(rename = "newOwnerId")]
        new_owner_id: String,
    },
}

impl RegistryEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::AgentRegistered { .. } => EventType::Registered,
            Self::AgentUpdated { .. } => EventType::Updated,
            Self::AgentDeactivated { .. } => EventType::Deactivated,
            Self::AgentReactivated { .. } => EventType::Reactivated,
            Self::OwnershipTransferred { .. } => EventType::OwnershipTransferred,
        }
    }

    pub fn agent_id(&self) -> &str {
        match self {
            Self::AgentRegistered { agent_id, .. }
            | Self::AgentUpdated { agent_id, .. }
            | Self::AgentDeactivated { agent_id }
            | Self::AgentReactivated { agent_id }
            | Self::OwnershipTransferred { agent_id, .. } => agent_id,
        }
    }

    /// Event arguments as a JSON object, as stored in the ledger's
    /// `data` column.
    pub fn payload(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => {
                map.get("data").cloned().unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        }
    }

    /// Rebuild an event from its ledger representation.
    pub fn from_parts(
        event_type: EventType,
        data: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::json!({
            "type": event_type.as_str(),
            "data": data,
        }))
    }
}

/// A registry event together with its delivery coordinates on the ledger.
///
/// An event is uniquely identified by `(transaction_hash, event_type)`;
/// the subscriber must never dispatch the same identity twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "blockNumber")]
    pub block_number: u64,
    #[serde(flatten)]
    pub event: RegistryEvent,
}

impl EventEnvelope {
    pub fn identity(&self) -> (&str, EventType) {
        (&self.transaction_hash, self.event.event_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered_envelope() -> EventEnvelope {
        EventEnvelope {
            transaction_hash: "0xabc".into(),
            block_number: 100,
            event: RegistryEvent::AgentRegistered {
                agent_id: "a1".into(),
                did: "did:x:1".into(),
                metadata_uri: "ipfs://Qm1".into(),
                owner_id: "u1".into(),
            },
        }
    }

    #[test]
    fn test_event_type_round_trip() {
        for ty in EventType::ALL {
            assert_eq!(ty.as_str().parse::<EventType>().unwrap(), ty);
        }
        assert!("AgentRenamed".parse::<EventType>().is_err());
    }

    #[test]
    fn test_envelope_serde_shape() {
        let value = serde_json::to_value(registered_envelope()).unwrap();
        assert_eq!(value["transactionHash"], "0xabc");
        assert_eq!(value["blockNumber"], 100);
        assert_eq!(value["type"], "AgentRegistered");
        assert_eq!(value["data"]["agentId"], "a1");
        assert_eq!(value["data"]["metadataUri"], "ipfs://Qm1");

        let back: EventEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, registered_envelope());
    }

    #[test]
    fn test_payload_and_from_parts() {
        let envelope = registered_envelope();
        let data = envelope.event.payload();
        assert_eq!(data["ownerId"], "u1");

        let rebuilt = RegistryEvent::from_parts(EventType::Registered, data).unwrap();
        assert_eq!(rebuilt, envelope.event);
    }

    #[test]
    fn test_identity() {
        let envelope = registered_envelope();
        assert_eq!(envelope.identity(), ("0xabc", EventType::Registered));
    }
}

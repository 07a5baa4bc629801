//! Request/response types for the registry contract interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated write call against the registry contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum RegistryCall {
    #[serde(rename_all = "camelCase")]
    Register {
        agent_id: String,
        did: String,
        metadata_uri: String,
        owner_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Update {
        agent_id: String,
        metadata_uri: String,
    },
    #[serde(rename_all = "camelCase")]
    Deactivate { agent_id: String },
    #[serde(rename_all = "camelCase")]
    Reactivate { agent_id: String },
    #[serde(rename_all = "camelCase")]
    TransferOwnership {
        agent_id: String,
        new_owner_id: String,
    },
}

impl RegistryCall {
    pub fn agent_id(&self) -> &str {
        match self {
            Self::Register { agent_id, .. }
            | Self::Update { agent_id, .. }
            | Self::Deactivate { agent_id }
            | Self::Reactivate { agent_id }
            | Self::TransferOwnership { agent_id, .. } => agent_id,
        }
    }
}

/// A submitted, not yet confirmed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub transaction_hash: String,
}

/// Receipt returned once a transaction has reached the requested
/// confirmation depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    /// Whether the transaction executed successfully on chain.
    pub status: bool,
}

/// Current on-chain state of one agent, as read from the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainAgent {
    pub agent_id: String,
    pub did: String,
    pub metadata_uri: String,
    pub owner_id: String,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of the ledger connection, cached with a short TTL because it
/// reflects near-real-time state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub network: String,
    pub chain_id: u64,
    pub latest_block: u64,
    pub contract_address: String,
}

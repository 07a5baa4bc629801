use crate::domain::errors::ChainError;
use crate::domain::models::{
    ChainStatus, EventEnvelope, EventType, OnChainAgent, PendingTransaction, RegistryCall,
    TransactionReceipt,
};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Port wrapping the ledger RPC endpoint and the deployed registry
/// contract.
///
/// Reads are idempotent. Writes are safe to resubmit after a transient
/// RPC failure: a duplicated logical operation is rejected by the
/// contract itself and surfaces as `ChainError::Endpoint`.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit a write call to the registry contract.
    async fn submit(&self, call: RegistryCall) -> Result<PendingTransaction, ChainError>;

    /// Suspend until `transaction_hash` has reached the requested
    /// confirmation depth, or fail with `ChainError::ConfirmationTimeout`.
    async fn wait_for_confirmation(
        &self,
        transaction_hash: &str,
        confirmations: u64,
    ) -> Result<TransactionReceipt, ChainError>;

    /// Read one agent's current on-chain state.
    async fn get_agent(&self, agent_id: &str) -> Result<Option<OnChainAgent>, ChainError>;

    /// Read the agent ids registered to one owner.
    async fn get_owner_agents(&self, owner_id: &str) -> Result<Vec<String>, ChainError>;

    /// Snapshot of the ledger connection.
    async fn status(&self) -> Result<ChainStatus, ChainError>;

    /// Highest mined block number.
    async fn latest_block(&self) -> Result<u64, ChainError>;

    /// Bounded historical scan of one event type over
    /// `[from_block, to_block]`, ascending by block number.
    async fn query_events(
        &self,
        event_type: EventType,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventEnvelope>, ChainError>;

    /// Subscribe to live event delivery. The ledger layer guarantees
    /// causal ordering per contract.
    fn subscribe(&self) -> broadcast::Receiver<EventEnvelope>;
}

//! In-memory chain client for tests and `--mock` local runs.
//!
//! Behaves like a single-node ledger: every submitted call mines one
//! block, mutates the registry state and emits the matching event on the
//! broadcast channel. Contract-level rejections ("agent already exists")
//! surface as `ChainError::Endpoint`, the same way a real node reports a
//! revert.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{broadcast, Mutex};

use crate::domain::errors::ChainError;
use crate::domain::models::{
    ChainStatus, EventEnvelope, EventType, OnChainAgent, PendingTransaction, RegistryCall,
    RegistryEvent, TransactionReceipt,
};
use crate::domain::ports::ChainClient;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

struct MockState {
    block: u64,
    tx_counter: u64,
    agents: HashMap<String, OnChainAgent>,
    log: Vec<EventEnvelope>,
    receipts: HashMap<String, TransactionReceipt>,
}

pub struct MockChain {
    state: Mutex<MockState>,
    events_tx: broadcast::Sender<EventEnvelope>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::with_start_block(0)
    }

    /// Start the mock ledger at a given block height, so tests can pin
    /// the block numbers events land on.
    pub fn with_start_block(block: u64) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(MockState {
                block,
                tx_counter: 0,
                agents: HashMap::new(),
                log: Vec::new(),
                receipts: HashMap::new(),
            }),
            events_tx,
        }
    }

    /// Mine `n` empty blocks.
    pub async fn mine(&self, n: u64) {
        self.state.lock().await.block += n;
    }

    /// Test hook: inject an event as if the contract had emitted it,
    /// without touching registry state.
    pub async fn emit(&self, envelope: EventEnvelope) {
        let mut state = self.state.lock().await;
        state.block = state.block.max(envelope.block_number);
        state.receipts.insert(
            envelope.transaction_hash.clone(),
            TransactionReceipt {
                transaction_hash: envelope.transaction_hash.clone(),
                block_number: envelope.block_number,
                status: true,
            },
        );
        state.log.push(envelope.clone());
        drop(state);
        let _ = self.events_tx.send(envelope);
    }

    fn apply(state: &mut MockState, call: RegistryCall) -> Result<RegistryEvent, ChainError> {
        match call {
            RegistryCall::Register {
                agent_id,
                did,
                metadata_uri,
                owner_id,
            } => {
                if state.agents.contains_key(&agent_id) {
                    return Err(ChainError::Endpoint(format!(
                        "agent {agent_id} already exists"
                    )));
                }
                let now = Utc::now();
                state.agents.insert(
                    agent_id.clone(),
                    OnChainAgent {
                        agent_id: agent_id.clone(),
                        did: did.clone(),
                        metadata_uri: metadata_uri.clone(),
                        owner_id: owner_id.clone(),
                        active: true,
                        registered_at: now,
                        updated_at: now,
                    },
                );
                Ok(RegistryEvent::AgentRegistered {
                    agent_id,
                    did,
                    metadata_uri,
                    owner_id,
                })
            }
            RegistryCall::Update {
                agent_id,
                metadata_uri,
            } => {
                let agent = state
                    .agents
                    .get_mut(&agent_id)
                    .ok_or_else(|| ChainError::Endpoint(format!("unknown agent {agent_id}")))?;
                agent.metadata_uri = metadata_uri.clone();
                agent.updated_at = Utc::now();
                Ok(RegistryEvent::AgentUpdated {
                    agent_id,
                    metadata_uri,
                })
            }
            RegistryCall::Deactivate { agent_id } => {
                let agent = state
                    .agents
                    .get_mut(&agent_id)
                    .ok_or_else(|| ChainError::Endpoint(format!("unknown agent {agent_id}")))?;
                agent.active = false;
                agent.updated_at = Utc::now();
                Ok(RegistryEvent::AgentDeactivated { agent_id })
            }
            RegistryCall::Reactivate { agent_id } => {
                let agent = state
                    .agents
                    .get_mut(&agent_id)
                    .ok_or_else(|| ChainError::Endpoint(format!("unknown agent {agent_id}")))?;
                agent.active = true;
                agent.updated_at = Utc::now();
                Ok(RegistryEvent::AgentReactivated { agent_id })
            }
            RegistryCall::TransferOwnership {
                agent_id,
                new_owner_id,
            } => {
                let agent = state
                    .agents
                    .get_mut(&agent_id)
                    .ok_or_else(|| ChainError::Endpoint(format!("unknown agent {agent_id}")))?;
                let old_owner_id = std::mem::replace(&mut agent.owner_id, new_owner_id.clone());
                agent.updated_at = Utc::now();
                Ok(RegistryEvent::OwnershipTransferred {
                    agent_id,
                    old_owner_id,
                    new_owner_id,
                })
            }
        }
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn submit(&self, call: RegistryCall) -> Result<PendingTransaction, ChainError> {
        let mut state = self.state.lock().await;
        let event = Self::apply(&mut state, call)?;

        state.block += 1;
        state.tx_counter += 1;
        let transaction_hash = format!("0xmock{:06}", state.tx_counter);

        let envelope = EventEnvelope {
            transaction_hash: transaction_hash.clone(),
            block_number: state.block,
            event,
        };
        let block_number = state.block;
        state.receipts.insert(
            transaction_hash.clone(),
            TransactionReceipt {
                transaction_hash: transaction_hash.clone(),
                block_number,
                status: true,
            },
        );
        state.log.push(envelope.clone());
        drop(state);

        let _ = self.events_tx.send(envelope);
        Ok(PendingTransaction { transaction_hash })
    }

    async fn wait_for_confirmation(
        &self,
        transaction_hash: &str,
        _confirmations: u64,
    ) -> Result<TransactionReceipt, ChainError> {
        // The mock mines instantly, so any known transaction is final.
        self.state
            .lock()
            .await
            .receipts
            .get(transaction_hash)
            .cloned()
            .ok_or_else(|| ChainError::ConfirmationTimeout {
                tx_hash: transaction_hash.to_string(),
                waited_ms: 0,
            })
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Option<OnChainAgent>, ChainError> {
        Ok(self.state.lock().await.agents.get(agent_id).cloned())
    }

    async fn get_owner_agents(&self, owner_id: &str) -> Result<Vec<String>, ChainError> {
        let state = self.state.lock().await;
        let mut ids: Vec<String> = state
            .agents
            .values()
            .filter(|a| a.owner_id == owner_id)
            .map(|a| a.agent_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn status(&self) -> Result<ChainStatus, ChainError> {
        let state = self.state.lock().await;
        Ok(ChainStatus {
            network: "mocknet".to_string(),
            chain_id: 31_337,
            latest_block: state.block,
            contract_address: "0xmock-registry".to_string(),
        })
    }

    async fn latest_block(&self) -> Result<u64, ChainError> {
        Ok(self.state.lock().await.block)
    }

    async fn query_events(
        &self,
        event_type: EventType,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventEnvelope>, ChainError> {
        let state = self.state.lock().await;
        Ok(state
            .log
            .iter()
            .filter(|e| {
                e.event.event_type() == event_type
                    && e.block_number >= from_block
                    && e.block_number <= to_block
            })
            .cloned()
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events_tx.subscribe()
    }
}

//! JSON-RPC chain client for the registry node.
//!
//! Writes are authorized with the configured signing credential; reads go
//! to the same endpoint. Live event delivery is implemented as a
//! block-cursor poll loop feeding a broadcast channel, so subscribers see
//! events in contract order without holding an open stream to the node.

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::domain::errors::ChainError;
use crate::domain::models::{
    ChainConfig, ChainStatus, EventEnvelope, EventType, OnChainAgent, PendingTransaction,
    RegistryCall, TransactionReceipt,
};
use crate::domain::ports::ChainClient;

use super::retry::RetryPolicy;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[allow(dead_code)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    network: String,
    chain_id: u64,
    latest_block: u64,
}

/// Shared request plumbing, cheap to clone into the poll task.
#[derive(Clone, Debug)]
struct RpcTransport {
    http: reqwest::Client,
    endpoint: String,
    signing_key: String,
    contract_address: String,
    request_id: Arc<AtomicU64>,
}

impl RpcTransport {
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.signing_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        let response: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(ChainError::Endpoint(error.message));
        }

        serde_json::from_value(response.result.unwrap_or(serde_json::Value::Null))
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))
    }

    async fn latest_block(&self) -> Result<u64, ChainError> {
        self.call("registry_blockNumber", serde_json::json!([])).await
    }

    async fn query_events(
        &self,
        event_type: EventType,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventEnvelope>, ChainError> {
        self.call(
            "registry_getEvents",
            serde_json::json!([self.contract_address, event_type.as_str(), from_block, to_block]),
        )
        .await
    }
}

/// `ChainClient` implementation backed by a registry node's JSON-RPC
/// endpoint.
#[derive(Debug)]
pub struct HttpChainClient {
    transport: RpcTransport,
    config: ChainConfig,
    retry: RetryPolicy,
    events_tx: broadcast::Sender<EventEnvelope>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl HttpChainClient {
    /// Build a client from configuration. Fails with
    /// `ChainError::NotConfigured` when a required value is missing.
    pub fn connect(config: ChainConfig, retry: RetryPolicy) -> Result<Self, ChainError> {
        if config.rpc_url.is_empty() {
            return Err(ChainError::NotConfigured("rpc_url"));
        }
        if config.signing_key.is_empty() {
            return Err(ChainError::NotConfigured("signing_key"));
        }
        if config.contract_address.is_empty() {
            return Err(ChainError::NotConfigured("contract_address"));
        }

        let transport = RpcTransport {
            http: reqwest::Client::new(),
            endpoint: config.rpc_url.clone(),
            signing_key: config.signing_key.clone(),
            contract_address: config.contract_address.clone(),
            request_id: Arc::new(AtomicU64::new(1)),
        };
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            transport,
            config,
            retry,
            events_tx,
            poller: Mutex::new(None),
        })
    }

    /// Start the live event poll loop from `from_block`. Connection
    /// failures are retried forever with capped exponential backoff;
    /// individual scan failures are logged and retried on the next tick.
    pub async fn start_event_poller(&self, from_block: u64) {
        let transport = self.transport.clone();
        let events_tx = self.events_tx.clone();
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        let handle = tokio::spawn(async move {
            let mut cursor = from_block;
            loop {
                let latest = backoff::future::retry(connect_backoff(), || async {
                    transport.latest_block().await.map_err(|e| {
                        if e.is_transient() {
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                })
                .await;

                let latest = match latest {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::error!(error = %e, "event poller cannot reach the RPC endpoint");
                        tokio::time::sleep(poll_interval).await;
                        continue;
                    }
                };

                if latest >= cursor {
                    for event_type in EventType::ALL {
                        match transport.query_events(event_type, cursor, latest).await {
                            Ok(events) => {
                                for envelope in events {
                                    let _ = events_tx.send(envelope);
                                }
                            }
                            Err(e) => {
                                tracing::warn!(%event_type, error = %e, "event scan failed, will retry next tick");
                            }
                        }
                    }
                    cursor = latest + 1;
                }

                tokio::time::sleep(poll_interval).await;
            }
        });

        *self.poller.lock().await = Some(handle);
    }

    /// Stop the live event poll loop.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.poller.lock().await.take() {
            handle.abort();
        }
    }
}

/// Unlimited retries, interval capped at a few seconds.
fn connect_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        max_interval: Duration::from_secs(5),
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn submit(&self, call: RegistryCall) -> Result<PendingTransaction, ChainError> {
        let params = serde_json::json!([self.transport.contract_address, call]);
        self.retry
            .execute(|| self.transport.call("registry_submit", params.clone()))
            .await
    }

    async fn wait_for_confirmation(
        &self,
        transaction_hash: &str,
        confirmations: u64,
    ) -> Result<TransactionReceipt, ChainError> {
        let deadline = tokio::time::Instant::now()
            + Duration::from_millis(self.config.confirmation_timeout_ms);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let receipt: Option<TransactionReceipt> = self
                .retry
                .execute(|| {
                    self.transport.call(
                        "registry_getTransactionReceipt",
                        serde_json::json!([transaction_hash]),
                    )
                })
                .await?;

            if let Some(receipt) = receipt {
                let latest = self
                    .retry
                    .execute(|| self.transport.latest_block())
                    .await?;
                if latest + 1 >= receipt.block_number + confirmations {
                    return Ok(receipt);
                }
            }

            if tokio::time::Instant::now() + poll_interval > deadline {
                return Err(ChainError::ConfirmationTimeout {
                    tx_hash: transaction_hash.to_string(),
                    waited_ms: self.config.confirmation_timeout_ms,
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Option<OnChainAgent>, ChainError> {
        let params = serde_json::json!([self.transport.contract_address, agent_id]);
        self.retry
            .execute(|| self.transport.call("registry_getAgent", params.clone()))
            .await
    }

    async fn get_owner_agents(&self, owner_id: &str) -> Result<Vec<String>, ChainError> {
        let params = serde_json::json!([self.transport.contract_address, owner_id]);
        self.retry
            .execute(|| self.transport.call("registry_getOwnerAgents", params.clone()))
            .await
    }

    async fn status(&self) -> Result<ChainStatus, ChainError> {
        let body: StatusBody = self
            .retry
            .execute(|| self.transport.call("registry_status", serde_json::json!([])))
            .await?;

        Ok(ChainStatus {
            network: body.network,
            chain_id: body.chain_id,
            latest_block: body.latest_block,
            contract_address: self.transport.contract_address.clone(),
        })
    }

    async fn latest_block(&self) -> Result<u64, ChainError> {
        self.retry
            .execute(|| self.transport.latest_block())
            .await
    }

    async fn query_events(
        &self,
        event_type: EventType,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventEnvelope>, ChainError> {
        self.retry
            .execute(|| self.transport.query_events(event_type, from_block, to_block))
            .await
    }

    fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RetryConfig;
    use mockito::Matcher;

    fn test_config(endpoint: &str) -> ChainConfig {
        ChainConfig {
            rpc_url: endpoint.to_string(),
            signing_key: "test-key".to_string(),
            contract_address: "0xregistry".to_string(),
            confirmations: 1,
            confirmation_timeout_ms: 2_000,
            poll_interval_ms: 10,
        }
    }

    fn no_retry() -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        })
    }

    #[test]
    fn test_connect_requires_configuration() {
        let mut config = test_config("http://localhost:8545");
        config.signing_key = String::new();
        let err = HttpChainClient::connect(config, no_retry()).unwrap_err();
        assert!(matches!(err, ChainError::NotConfigured("signing_key")));
    }

    #[tokio::test]
    async fn test_get_agent_parses_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "method": "registry_getAgent"
            })))
            .with_body(
                serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {
                        "agentId": "a1",
                        "did": "did:x:1",
                        "metadataUri": "ipfs://Qm1",
                        "ownerId": "u1",
                        "active": true,
                        "registeredAt": "2026-01-01T00:00:00Z",
                        "updatedAt": "2026-01-01T00:00:00Z"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = HttpChainClient::connect(test_config(&server.url()), no_retry()).unwrap();
        let agent = client.get_agent("a1").await.unwrap().unwrap();
        assert_eq!(agent.agent_id, "a1");
        assert_eq!(agent.owner_id, "u1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_null_result_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
            .create_async()
            .await;

        let client = HttpChainClient::connect(test_config(&server.url()), no_retry()).unwrap();
        assert!(client.get_agent("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_endpoint_error_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"agent already exists"}}"#,
            )
            .create_async()
            .await;

        let client = HttpChainClient::connect(test_config(&server.url()), no_retry()).unwrap();
        let err = client
            .submit(RegistryCall::Deactivate {
                agent_id: "a1".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Endpoint(m) if m == "agent already exists"));
    }

    #[tokio::test]
    async fn test_status_fills_contract_address() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":{"network":"testnet","chainId":80001,"latestBlock":1234}}"#,
            )
            .create_async()
            .await;

        let client = HttpChainClient::connect(test_config(&server.url()), no_retry()).unwrap();
        let status = client.status().await.unwrap();
        assert_eq!(status.network, "testnet");
        assert_eq!(status.latest_block, 1234);
        assert_eq!(status.contract_address, "0xregistry");
    }
}

//! HTTP-gateway metadata fetcher.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::MetadataError;
use crate::domain::models::{extract_cid, is_valid_ipfs_uri, MetadataConfig};
use crate::domain::ports::MetadataFetcher;

/// Resolves `ipfs://<cid>` URIs through a public or self-hosted gateway.
pub struct IpfsGateway {
    http: reqwest::Client,
    base_url: String,
}

impl IpfsGateway {
    pub fn new(config: &MetadataConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetadataFetcher for IpfsGateway {
    async fn fetch(&self, uri: &str) -> Result<serde_json::Value, MetadataError> {
        if !is_valid_ipfs_uri(uri) {
            return Err(MetadataError::InvalidUri(uri.to_string()));
        }

        let url = format!("{}/ipfs/{}", self.base_url, extract_cid(uri));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MetadataError::Gateway(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| MetadataError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base_url: &str) -> IpfsGateway {
        IpfsGateway::new(&MetadataConfig {
            gateway_url: base_url.to_string(),
            request_timeout_ms: 2_000,
        })
    }

    #[tokio::test]
    async fn test_fetch_parses_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ipfs/Qm1")
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"summarizer","version":"1.0.0"}"#)
            .create_async()
            .await;

        let doc = gateway(&server.url()).fetch("ipfs://Qm1").await.unwrap();
        assert_eq!(doc["name"], "summarizer");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejects_non_ipfs_uri() {
        let err = gateway("http://localhost")
            .fetch("https://example.com/doc.json")
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidUri(_)));
    }

    #[tokio::test]
    async fn test_gateway_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ipfs/QmMissing")
            .with_status(404)
            .create_async()
            .await;

        let err = gateway(&server.url())
            .fetch("ipfs://QmMissing")
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Gateway(404)));
    }
}

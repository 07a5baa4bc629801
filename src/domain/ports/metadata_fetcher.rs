use crate::domain::errors::MetadataError;
use async_trait::async_trait;

/// Port for resolving content-addressed metadata documents.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch and parse the document at an `ipfs://<cid>` URI.
    async fn fetch(&self, uri: &str) -> Result<serde_json::Value, MetadataError>;
}

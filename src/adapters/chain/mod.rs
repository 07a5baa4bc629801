//! Chain client adapters: the JSON-RPC client used in production and an
//! in-memory mock ledger for tests and local runs.

pub mod http_client;
pub mod mock;
pub mod retry;

pub use http_client::HttpChainClient;
pub use mock::MockChain;
pub use retry::RetryPolicy;

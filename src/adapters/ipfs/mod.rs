//! Content-address gateway adapter for off-chain metadata.

pub mod gateway;

pub use gateway::IpfsGateway;

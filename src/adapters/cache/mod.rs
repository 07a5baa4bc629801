//! In-memory caching adapter.
//!
//! Uses `moka` for TTL-based concurrent caching. Never authoritative:
//! every entry is reconstructible from the chain client or the document
//! store.

pub mod moka_store;

pub use moka_store::MokaCacheStore;

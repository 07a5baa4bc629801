//! Service layer: the sync pipeline and the registry surface.

pub mod cache_layer;
pub mod event_subscriber;
pub mod registry_service;
pub mod sync_processor;

pub use cache_layer::CacheLayer;
pub use event_subscriber::EventSubscriber;
pub use registry_service::{NewAgent, RegistryService};
pub use sync_processor::{SyncOutcome, SyncProcessor};

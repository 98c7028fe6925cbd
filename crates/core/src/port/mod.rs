// Port Layer - Interfaces for external dependencies

pub mod cache_purger;
pub mod document_source;
pub mod id_provider; // For deterministic testing
pub mod job_scheduler;
pub mod kv_store;
pub mod maintenance;
pub mod time_provider;
pub mod translation_client;

// Re-exports
pub use cache_purger::CachePurger;
pub use document_source::{DocumentSource, DocumentWriter};
pub use id_provider::{IdProvider, UuidProvider};
pub use job_scheduler::JobScheduler;
pub use kv_store::{KeyValueStore, Namespace};
pub use maintenance::{Maintenance, MaintenanceConfig, MaintenanceReport, MaintenanceStats};
pub use time_provider::{SystemTimeProvider, TimeProvider};
pub use translation_client::{TranslateError, TranslationClient};

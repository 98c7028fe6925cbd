// Application Layer - Use Cases and Business Logic

pub mod cache_store;
pub mod constants;
pub mod job_lock;
pub mod maintenance;
pub mod orchestrator;
pub mod progress;
pub mod render;
pub mod resolver;
pub mod scheduler;
pub mod shutdown;
pub mod status;

// Re-exports
pub use cache_store::CacheStore;
pub use job_lock::JobLock;
pub use maintenance::MaintenanceScheduler;
pub use orchestrator::{BulkOutcome, JobOrchestrator, JobSettings};
pub use progress::ProgressLog;
pub use render::{RenderMode, RenderOutcome, RenderService};
pub use resolver::{canonical_type, SourceResolver};
pub use scheduler::DeferredScheduler;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use status::{DocumentStatus, LanguageStatus, StatusQuery, StatusService};

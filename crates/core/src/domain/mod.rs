// Domain Layer - Pure business logic and entities

pub mod chunk;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod job;
pub mod translation;

// Re-exports
pub use chunk::{merge_chunks, split_chunks};
pub use document::{DocumentKey, SourceDocument, TranslationRequest};
pub use error::DomainError;
pub use fingerprint::Fingerprint;
pub use job::{JobPhase, JobResult, JobRun, ProgressSnapshot};
pub use translation::{TranslationRecord, TranslationStatus};

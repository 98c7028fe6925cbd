// Application constants (no magic values)
use std::time::Duration;

/// Lifetime of a job lock; an orphaned lock frees itself after this (30 min)
pub const LOCK_TTL: Duration = Duration::from_secs(30 * 60);

/// Lifetime of progress lines and terminal results (30 min)
pub const PROGRESS_TTL: Duration = Duration::from_secs(30 * 60);

/// Chunk budget in bytes for one engine call
pub const DEFAULT_CHUNK_MAX_LEN: usize = 12_000;

/// Pause between consecutive chunk calls (not after the last)
pub const DEFAULT_INTER_CHUNK_DELAY: Duration = Duration::from_secs(1);

/// Delay before a render-triggered job starts
pub const DEFERRED_SCHEDULE_DELAY: Duration = Duration::from_secs(5);

/// Engine model when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Store key prefix of source documents
pub const DEFAULT_DOCUMENT_PREFIX: &str = "doc_";

/// Final progress line of a successful run
pub const SUCCESS_LINE: &str = "Saved translation successfully.";

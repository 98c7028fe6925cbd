// Page Cache Purger Port (Interface)
// Best-effort: callers log failures and carry on

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CachePurger: Send + Sync {
    /// Human-readable name used in progress lines
    fn name(&self) -> &str;

    /// Purge the whole page cache
    async fn purge_all(&self) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts purges, optionally failing every one
    pub struct RecordingPurger {
        name: String,
        fail: bool,
        purges: AtomicUsize,
    }

    impl RecordingPurger {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                fail: false,
                purges: AtomicUsize::new(0),
            }
        }

        pub fn failing(name: &str) -> Self {
            Self {
                fail: true,
                ..Self::new(name)
            }
        }

        pub fn purge_count(&self) -> usize {
            self.purges.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CachePurger for RecordingPurger {
        fn name(&self) -> &str {
            &self.name
        }

        async fn purge_all(&self) -> Result<()> {
            self.purges.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(crate::AppError::Internal("purge endpoint unavailable".to_string()));
            }
            Ok(())
        }
    }
}

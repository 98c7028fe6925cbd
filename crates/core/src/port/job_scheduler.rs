// Job Scheduler Port (Interface)
// "Run this admitted job later, once"

use crate::domain::TranslationRequest;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Schedule an admitted run after `delay`
    ///
    /// `run_id` is the owner recorded in the lock the caller acquired.
    ///
    /// # Returns
    /// `false` if a run for the same key is already pending
    async fn schedule(&self, request: TranslationRequest, run_id: String, delay: Duration)
        -> Result<bool>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ScheduledRun {
        pub request: TranslationRequest,
        pub run_id: String,
        pub delay: Duration,
    }

    /// Records scheduled requests without running them
    #[derive(Default)]
    pub struct RecordingScheduler {
        scheduled: Mutex<Vec<ScheduledRun>>,
        fail: bool,
    }

    impl RecordingScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn scheduled(&self) -> Vec<ScheduledRun> {
            self.scheduled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobScheduler for RecordingScheduler {
        async fn schedule(
            &self,
            request: TranslationRequest,
            run_id: String,
            delay: Duration,
        ) -> Result<bool> {
            if self.fail {
                return Err(crate::AppError::Scheduling("runtime is shutting down".to_string()));
            }
            self.scheduled.lock().unwrap().push(ScheduledRun {
                request,
                run_id,
                delay,
            });
            Ok(true)
        }
    }
}

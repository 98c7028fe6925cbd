//! Deferred Scheduler - run an admitted job later, once per key
//!
//! Render requests that win the lock hand the job over here and return
//! immediately. A key with a run still waiting to start is not scheduled a
//! second time.

use super::orchestrator::JobOrchestrator;
use crate::domain::{DocumentKey, TranslationRequest};
use crate::error::{AppError, Result};
use crate::port::JobScheduler;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info};

pub struct DeferredScheduler {
    orchestrator: Arc<JobOrchestrator>,
    pending: Arc<Mutex<HashSet<DocumentKey>>>,
}

impl DeferredScheduler {
    pub fn new(orchestrator: Arc<JobOrchestrator>) -> Self {
        Self {
            orchestrator,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Runs scheduled but not yet started
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Internal("scheduler mutex poisoned".to_string())
}

#[async_trait]
impl JobScheduler for DeferredScheduler {
    async fn schedule(
        &self,
        request: TranslationRequest,
        run_id: String,
        delay: Duration,
    ) -> Result<bool> {
        let key = request.key();

        if !self.pending.lock().map_err(poisoned)?.insert(key.clone()) {
            debug!(key = %key, "Run already pending; not scheduling again");
            return Ok(false);
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.pending.lock().map_err(poisoned)?.remove(&key);
                return Err(AppError::Scheduling(e.to_string()));
            }
        };

        let orchestrator = self.orchestrator.clone();
        let pending = self.pending.clone();
        info!(key = %key, run_id = %run_id, delay_ms = delay.as_millis() as u64, "Job scheduled");

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut pending) = pending.lock() {
                pending.remove(&key);
            }
            // Outcome is recorded as the terminal result; nothing to return here
            if let Err(e) = orchestrator.run_admitted(request, run_id).await {
                error!(key = %key, error = %e, "Deferred job failed");
            }
        });

        Ok(true)
    }
}

// Job Orchestrator - drives one translation run from source fetch to commit
//
// Every run holds the lock for its DocumentKey under its own run id. It
// releases only that lock and writes one terminal result while holding it.


use super::cache_store::CacheStore;
use super::constants::{
    DEFAULT_CHUNK_MAX_LEN, DEFAULT_INTER_CHUNK_DELAY, DEFAULT_MODEL, SUCCESS_LINE,
};
use super::job_lock::JobLock;
use super::progress::ProgressLog;
use super::resolver::SourceResolver;
use crate::domain::{
    merge_chunks, split_chunks, DocumentKey, Fingerprint, JobPhase, JobResult, JobRun,
    TranslationRecord, TranslationRequest,
};
use crate::error::{AppError, Result};
use crate::port::{CachePurger, IdProvider, TimeProvider, TranslationClient};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

/// Per-deployment knobs of a run
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub model: String,
    /// Chunk budget in bytes
    pub chunk_max_len: usize,
    pub inter_chunk_delay: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            chunk_max_len: DEFAULT_CHUNK_MAX_LEN,
            inter_chunk_delay: DEFAULT_INTER_CHUNK_DELAY,
        }
    }
}

/// Result of one request in a bulk run
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub document_type: String,
    pub target_lang: String,
    pub ok: bool,
    pub message: String,
}

pub struct JobOrchestrator {
    resolver: Arc<SourceResolver>,
    client: Arc<dyn TranslationClient>,
    cache: CacheStore,
    lock: JobLock,
    progress: ProgressLog,
    purger: Option<Arc<dyn CachePurger>>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    settings: JobSettings,
}

/// Progress lines of the current run, mirrored to the ProgressLog on every push
struct RunLog<'a> {
    key: &'a DocumentKey,
    progress: &'a ProgressLog,
    lines: Vec<String>,
}

impl RunLog<'_> {
    async fn push(&mut self, line: impl Into<String>) -> Result<()> {
        self.lines.push(line.into());
        self.progress.publish(self.key, &self.lines).await
    }
}

impl JobOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: Arc<SourceResolver>,
        client: Arc<dyn TranslationClient>,
        cache: CacheStore,
        lock: JobLock,
        progress: ProgressLog,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        settings: JobSettings,
    ) -> Self {
        Self {
            resolver,
            client,
            cache,
            lock,
            progress,
            purger: None,
            time_provider,
            id_provider,
            settings,
        }
    }

    /// Purge the page cache after every commit
    pub fn with_purger(mut self, purger: Arc<dyn CachePurger>) -> Self {
        self.purger = Some(purger);
        self
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Execute a run whose lock the caller already holds under `run_id`.
    ///
    /// Releases the lock on every path, writes the terminal result and drops
    /// the progress lines once the result is in place. A run that lost its
    /// lock along the way (expired or force-released) leaves the lock, the
    /// lines and the result slot to the current holder.
    ///
    /// # Returns
    /// The run's progress lines
    pub async fn run_admitted(
        &self,
        request: TranslationRequest,
        run_id: String,
    ) -> Result<Vec<String>> {
        let key = request.key();
        let mut run = JobRun::new(run_id, key.clone(), self.time_provider.now_millis());
        let span = info_span!("translation_job", run_id = %run.run_id, key = %key);

        async {
            info!("Job admitted");
            let mut log = RunLog {
                key: &key,
                progress: &self.progress,
                lines: Vec::new(),
            };

            let outcome = self.execute(&request, &mut run, &mut log).await;
            if outcome.is_err() {
                run.fail(self.time_provider.now_millis());
            }
            let result = match &outcome {
                Ok(()) => JobResult::Success {
                    logs: log.lines.clone(),
                },
                Err(e) => {
                    error!(error = %e, kind = e.kind(), "Job failed");
                    JobResult::Failure {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    }
                }
            };

            if let Err(finish_err) = self.finish(&key, &run.run_id, &result).await {
                error!(error = %finish_err, "Failed to finish run");
                if outcome.is_ok() {
                    return Err(finish_err);
                }
            }
            outcome?;
            info!(phase = %run.phase, "Job finished");
            Ok(log.lines)
        }
        .instrument(span)
        .await
    }

    /// Write the terminal result, drop the lines, then release the lock.
    /// Skipped entirely when `run_id` no longer holds the lock.
    async fn finish(&self, key: &DocumentKey, run_id: &str, result: &JobResult) -> Result<()> {
        if !self.lock.is_held_by(key, run_id).await? {
            warn!("Lock lost during run; result not recorded");
            return Ok(());
        }
        let recorded = self.progress.set_result(key, result).await;
        if let Err(clear_err) = self.progress.clear_lines(key).await {
            warn!(error = %clear_err, "Failed to drop progress lines");
        }
        self.lock.release(key, run_id).await?;
        recorded
    }

    /// Phases SourceFetch through Done. The lock is left to the caller.
    async fn execute(
        &self,
        request: &TranslationRequest,
        run: &mut JobRun,
        log: &mut RunLog<'_>,
    ) -> Result<()> {
        let key = log.key;

        // 1. SourceFetch
        run.advance(JobPhase::SourceFetch, self.time_provider.now_millis())?;
        let source = self.resolver.resolve(request).await?.ok_or_else(|| {
            AppError::SourceNotFound(format!(
                "{} ({}{})",
                request.document_type,
                request.source_lang,
                request
                    .country()
                    .map(|c| format!("_{}", c.to_uppercase()))
                    .unwrap_or_default()
            ))
        })?;
        log.push(format!(
            "Found: {} ({} chars).",
            source.key,
            source.content.len()
        ))
        .await?;

        // 2. CacheCheck
        run.advance(JobPhase::CacheCheck, self.time_provider.now_millis())?;
        let fingerprint = Fingerprint::of(&source.content);
        if let Some(record) = self.cache.get(key).await? {
            if record.is_valid_for(&fingerprint) {
                log.push("Already up to date. Skipped.").await?;
                run.advance(JobPhase::UpToDate, self.time_provider.now_millis())?;
                return Ok(());
            }
        }

        // 3. Translating
        run.advance(JobPhase::Translating, self.time_provider.now_millis())?;
        let model = self.settings.model.as_str();
        let chunks = split_chunks(&source.content, self.settings.chunk_max_len);
        let total = chunks.len();
        if total > 1 {
            log.push(format!("Large document split into {} parts ({}).", total, model))
                .await?;
        } else {
            log.push(format!("Sending to engine ({})...", model)).await?;
        }

        let mut parts = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            let part = i + 1;
            log.push(format!(
                "Translating part {} / {} ({} chars)...",
                part,
                total,
                chunk.len()
            ))
            .await?;

            let translated = self
                .client
                .translate(chunk, &request.source_lang, &request.target_lang, model)
                .await
                .map_err(|e| {
                    warn!(chunk = part, total, error = %e, "Chunk translation failed");
                    e
                })?;
            parts.push(translated);
            log.push(format!("Part {} / {} done.", part, total)).await?;

            if part < total && !self.settings.inter_chunk_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_chunk_delay).await;
            }
        }

        // 4. Merging
        run.advance(JobPhase::Merging, self.time_provider.now_millis())?;
        let merged = merge_chunks(&parts);

        // 5. Committing
        run.advance(JobPhase::Committing, self.time_provider.now_millis())?;
        log.push("Saving to database...").await?;
        let record = TranslationRecord::new(fingerprint, merged, self.time_provider.now_millis());
        self.cache.put(key, &record).await?;

        if let Some(purger) = &self.purger {
            match purger.purge_all().await {
                Ok(()) => {
                    log.push(format!("Cache purged: {}.", purger.name())).await?;
                }
                Err(e) => warn!(purger = purger.name(), error = %e, "Cache purge failed"),
            }
        }

        run.advance(JobPhase::Done, self.time_provider.now_millis())?;
        log.push(SUCCESS_LINE).await?;
        Ok(())
    }

    /// Take the lock for a manual run.
    ///
    /// With `force`, the cached translation is discarded and a held lock is
    /// broken first.
    ///
    /// # Returns
    /// The run id now holding the lock
    ///
    /// # Errors
    /// - AppError::LockRaceDetected if another run holds the lock (non-force)
    async fn admit(&self, request: &TranslationRequest, force: bool) -> Result<String> {
        request.validate()?;
        let key = request.key();

        if force {
            self.cache.invalidate(&key).await?;
            self.lock.force_release(&key).await?;
            info!(key = %key, "Forced refresh: cache invalidated");
        }

        let run_id = self.id_provider.generate_id();
        if !self.lock.try_acquire(&key, &run_id).await? {
            return Err(AppError::LockRaceDetected(key.to_string()));
        }

        // Leftovers of an earlier run must not be mistaken for this one
        if let Err(e) = self.progress.clear(&key).await {
            let _ = self.lock.release(&key, &run_id).await;
            return Err(e);
        }
        Ok(run_id)
    }

    /// Manual run: admit through the lock, then execute.
    ///
    /// # Errors
    /// - AppError::LockRaceDetected if another run holds the lock (non-force)
    pub async fn run_job(&self, request: TranslationRequest, force: bool) -> Result<Vec<String>> {
        let run_id = self.admit(&request, force).await?;
        self.run_admitted(request, run_id).await
    }

    /// Run inline and claim the terminal result through the same take-once
    /// read pollers use. A failed run is reported as an error only to the
    /// caller that claimed it.
    ///
    /// # Returns
    /// `None` if a poller already delivered the result
    pub async fn run_and_claim(
        &self,
        request: TranslationRequest,
        force: bool,
    ) -> Result<Option<JobResult>> {
        let key = request.key();
        let run_id = self.admit(&request, force).await?;

        match self.run_admitted(request, run_id).await {
            Ok(_) => self.progress.take_result(&key).await,
            Err(e) => match self.progress.take_result(&key).await {
                Ok(Some(_)) => Err(e),
                Ok(None) => {
                    info!(key = %key, error = %e, "Failure already delivered to a poller");
                    Ok(None)
                }
                Err(take_err) => {
                    warn!(key = %key, error = %take_err, "Failed to claim failure result");
                    Err(e)
                }
            },
        }
    }

    /// Run requests one after another; a failure does not stop the batch
    pub async fn run_bulk(&self, requests: Vec<TranslationRequest>, force: bool) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            let document_type = request.document_type.clone();
            let target_lang = request.target_lang.clone();

            let outcome = match self.run_job(request, force).await {
                Ok(logs) => BulkOutcome {
                    document_type,
                    target_lang,
                    ok: true,
                    message: logs.last().cloned().unwrap_or_else(|| SUCCESS_LINE.to_string()),
                },
                Err(e) => BulkOutcome {
                    document_type,
                    target_lang,
                    ok: false,
                    message: e.to_string(),
                },
            };
            info!(
                document_type = %outcome.document_type,
                target_lang = %outcome.target_lang,
                ok = outcome.ok,
                "Bulk item finished"
            );
            outcomes.push(outcome);
        }
        outcomes
    }
}

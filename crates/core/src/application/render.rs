// Render Service - the read path behind every page view
//
// Never waits for a translation: it serves a fresh cache entry, or reports
// progress, or admits and schedules a job and says so.

use super::cache_store::CacheStore;
use super::job_lock::JobLock;
use super::resolver::SourceResolver;
use crate::domain::{Fingerprint, TranslationRequest};
use crate::error::Result;
use crate::port::{IdProvider, JobScheduler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// When a render-triggered job starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// After the configured deferral delay
    Deferred,
    /// As soon as possible
    Immediate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    NotFound {
        document_type: String,
    },
    Translated {
        document_type: String,
        target_lang: String,
        content: String,
    },
    InProgress {
        target_lang: String,
    },
    Started {
        target_lang: String,
    },
}

#[derive(Debug, Clone, Copy)]
enum AlertColor {
    Red,
    Orange,
    Blue,
}

impl AlertColor {
    fn name(self) -> &'static str {
        match self {
            AlertColor::Red => "red",
            AlertColor::Orange => "orange",
            AlertColor::Blue => "blue",
        }
    }

    /// (background, text/border)
    fn palette(self) -> (&'static str, &'static str) {
        match self {
            AlertColor::Red => ("#fde8e8", "#9b1c1c"),
            AlertColor::Orange => ("#fff4e5", "#8a4b00"),
            AlertColor::Blue => ("#e8f1fd", "#1e429f"),
        }
    }
}

/// Escape text for HTML body and attribute positions
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn alert(message: &str, color: AlertColor) -> String {
    let (background, foreground) = color.palette();
    format!(
        "<div class=\"transcache-alert transcache-alert-{}\" style=\"background:{}; color:{}; padding:15px; border-radius:4px; border:1px solid {};\"><strong>Transcache:</strong> {}</div>",
        color.name(),
        background,
        foreground,
        foreground,
        escape_html(message)
    )
}

impl RenderOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            RenderOutcome::NotFound { .. } => "not_found",
            RenderOutcome::Translated { .. } => "translated",
            RenderOutcome::InProgress { .. } => "in_progress",
            RenderOutcome::Started { .. } => "started",
        }
    }

    /// Markup for the page. Translated content is trusted HTML; everything
    /// else is escaped.
    pub fn to_html(&self) -> String {
        match self {
            RenderOutcome::NotFound { document_type } => alert(
                &format!("Source '{}' not found.", document_type),
                AlertColor::Red,
            ),
            RenderOutcome::Translated {
                document_type,
                target_lang,
                content,
            } => format!(
                "<div class=\"transcache-text type-{} lang-{}\">{}</div>",
                escape_html(document_type),
                escape_html(target_lang),
                content
            ),
            RenderOutcome::InProgress { target_lang } => alert(
                &format!(
                    "Translation to {} in progress... Please refresh in a minute.",
                    target_lang.to_uppercase()
                ),
                AlertColor::Orange,
            ),
            RenderOutcome::Started { target_lang } => alert(
                &format!(
                    "Source changed. Auto-translating to {}...",
                    target_lang.to_uppercase()
                ),
                AlertColor::Blue,
            ),
        }
    }
}

pub struct RenderService {
    resolver: Arc<SourceResolver>,
    cache: CacheStore,
    lock: JobLock,
    scheduler: Arc<dyn JobScheduler>,
    id_provider: Arc<dyn IdProvider>,
    deferred_delay: Duration,
}

impl RenderService {
    pub fn new(
        resolver: Arc<SourceResolver>,
        cache: CacheStore,
        lock: JobLock,
        scheduler: Arc<dyn JobScheduler>,
        id_provider: Arc<dyn IdProvider>,
        deferred_delay: Duration,
    ) -> Self {
        Self {
            resolver,
            cache,
            lock,
            scheduler,
            id_provider,
            deferred_delay,
        }
    }

    pub async fn render(&self, request: TranslationRequest, mode: RenderMode) -> Result<RenderOutcome> {
        request.validate()?;
        let key = request.key();

        let Some(source) = self.resolver.resolve(&request).await? else {
            debug!(key = %key, "Render: source not found");
            return Ok(RenderOutcome::NotFound {
                document_type: request.document_type,
            });
        };

        let fingerprint = Fingerprint::of(&source.content);
        if let Some(record) = self.cache.get(&key).await? {
            if record.is_valid_for(&fingerprint) {
                return Ok(RenderOutcome::Translated {
                    document_type: request.document_type,
                    target_lang: request.target_lang,
                    content: record.content,
                });
            }
        }

        let run_id = self.id_provider.generate_id();
        if self.lock.is_held(&key).await? || !self.lock.try_acquire(&key, &run_id).await? {
            return Ok(RenderOutcome::InProgress {
                target_lang: request.target_lang,
            });
        }

        let delay = match mode {
            RenderMode::Deferred => self.deferred_delay,
            RenderMode::Immediate => Duration::ZERO,
        };
        let target_lang = request.target_lang.clone();
        if let Err(e) = self.scheduler.schedule(request, run_id.clone(), delay).await {
            error!(key = %key, error = %e, "Failed to schedule job; releasing lock");
            self.lock.release(&key, &run_id).await?;
            return Err(e);
        }

        info!(key = %key, ?mode, "Render admitted a translation job");
        Ok(RenderOutcome::Started { target_lang })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::constants::LOCK_TTL;
    use crate::domain::{DocumentKey, TranslationRecord};
    use crate::port::document_source::mocks::InMemoryDocumentSource;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_scheduler::mocks::RecordingScheduler;
    use crate::port::kv_store::memory::InMemoryKeyValueStore;
    use crate::port::time_provider::mocks::ManualTimeProvider;

    struct Setup {
        docs: Arc<InMemoryDocumentSource>,
        cache: CacheStore,
        lock: JobLock,
        scheduler: Arc<RecordingScheduler>,
        service: RenderService,
    }

    fn setup_with(scheduler: RecordingScheduler) -> Setup {
        let kv = Arc::new(InMemoryKeyValueStore::new(Arc::new(ManualTimeProvider::new(0))));
        let docs = Arc::new(InMemoryDocumentSource::new());
        let cache = CacheStore::new(kv.clone());
        let lock = JobLock::new(kv, LOCK_TTL);
        let scheduler = Arc::new(scheduler);
        let service = RenderService::new(
            Arc::new(SourceResolver::new(docs.clone(), "doc_")),
            cache.clone(),
            lock.clone(),
            scheduler.clone(),
            Arc::new(SequentialIdProvider::default()),
            Duration::from_secs(5),
        );
        Setup {
            docs,
            cache,
            lock,
            scheduler,
            service,
        }
    }

    fn setup() -> Setup {
        setup_with(RecordingScheduler::new())
    }

    fn request() -> TranslationRequest {
        TranslationRequest::new("impressum", "de", Some("CH"), "fr")
    }

    #[tokio::test]
    async fn test_missing_source() {
        let s = setup();
        let outcome = s.service.render(request(), RenderMode::Deferred).await.unwrap();

        assert_eq!(outcome.status(), "not_found");
        assert!(outcome.to_html().contains("Source &#39;impressum&#39; not found."));
        assert!(s.scheduler.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_fresh_cache_is_served() {
        let s = setup();
        s.docs.insert("doc_de_CH_impressum", "<p>Hallo</p>");
        let record = TranslationRecord::new(Fingerprint::of("<p>Hallo</p>"), "<p>Bonjour</p>", 1);
        s.cache.put(&DocumentKey::new("impressum", "fr"), &record).await.unwrap();

        let outcome = s.service.render(request(), RenderMode::Deferred).await.unwrap();

        assert_eq!(
            outcome.to_html(),
            "<div class=\"transcache-text type-impressum lang-fr\"><p>Bonjour</p></div>"
        );
        assert!(s.scheduler.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_stale_cache_admits_and_schedules() {
        let s = setup();
        s.docs.insert("doc_de_CH_impressum", "<p>Hallo neu</p>");
        let record = TranslationRecord::new(Fingerprint::of("<p>Hallo</p>"), "<p>Bonjour</p>", 1);
        let key = DocumentKey::new("impressum", "fr");
        s.cache.put(&key, &record).await.unwrap();

        let outcome = s.service.render(request(), RenderMode::Deferred).await.unwrap();

        assert_eq!(outcome.status(), "started");
        assert!(outcome.to_html().contains("Auto-translating to FR..."));
        assert!(s.lock.is_held(&key).await.unwrap());
        let scheduled = s.scheduler.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].delay, Duration::from_secs(5));
        // The scheduled run owns the lock it will release
        assert!(s.lock.is_held_by(&key, &scheduled[0].run_id).await.unwrap());

        // A second render sees the lock
        let outcome = s.service.render(request(), RenderMode::Deferred).await.unwrap();
        assert_eq!(outcome.status(), "in_progress");
        assert!(outcome.to_html().contains("Translation to FR in progress"));
        assert_eq!(s.scheduler.scheduled().len(), 1);
    }

    #[tokio::test]
    async fn test_immediate_mode_has_no_delay() {
        let s = setup();
        s.docs.insert("doc_de_CH_impressum", "<p>Hallo</p>");

        s.service.render(request(), RenderMode::Immediate).await.unwrap();

        assert_eq!(s.scheduler.scheduled()[0].delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_scheduling_failure_releases_lock() {
        let s = setup_with(RecordingScheduler::failing());
        s.docs.insert("doc_de_CH_impressum", "<p>Hallo</p>");

        let err = s.service.render(request(), RenderMode::Deferred).await.unwrap_err();

        assert_eq!(err.kind(), "scheduling");
        assert!(!s.lock.is_held(&DocumentKey::new("impressum", "fr")).await.unwrap());
    }

    #[test]
    fn test_alert_escapes_message() {
        let outcome = RenderOutcome::NotFound {
            document_type: "<script>".to_string(),
        };
        let html = outcome.to_html();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("transcache-alert-red"));
    }
}

//! Shared wiring for the scenario tests: SQLite in memory, scripted engine,
//! manual clock.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use transcache_core::application::constants::{LOCK_TTL, PROGRESS_TTL};
use transcache_core::application::{
    CacheStore, DeferredScheduler, JobLock, JobOrchestrator, JobSettings, ProgressLog,
    RenderService, SourceResolver, StatusService,
};
use transcache_core::domain::SourceDocument;
use transcache_core::port::id_provider::mocks::SequentialIdProvider;
use transcache_core::port::time_provider::mocks::ManualTimeProvider;
use transcache_core::port::translation_client::mocks::MockTranslationClient;
use transcache_core::port::DocumentWriter;
use transcache_infra_sqlite::{
    create_pool, run_migrations, SqliteDocumentSource, SqliteKeyValueStore, SqliteMaintenance,
};

pub const START_MILLIS: i64 = 1_700_000_000_000;

pub struct Engine {
    pub clock: Arc<ManualTimeProvider>,
    pub documents: Arc<SqliteDocumentSource>,
    pub maintenance: Arc<SqliteMaintenance>,
    pub client: Arc<MockTranslationClient>,
    pub cache: CacheStore,
    pub lock: JobLock,
    pub progress: ProgressLog,
    pub resolver: Arc<SourceResolver>,
    pub ids: Arc<SequentialIdProvider>,
    pub orchestrator: Arc<JobOrchestrator>,
}

impl Engine {
    pub async fn new(client: MockTranslationClient, chunk_max_len: usize) -> Self {
        let pool = create_pool(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(ManualTimeProvider::new(START_MILLIS));
        let kv = Arc::new(SqliteKeyValueStore::new(pool.clone(), clock.clone()));
        let maintenance = Arc::new(SqliteMaintenance::new(pool.clone(), clock.clone()));
        let documents = Arc::new(SqliteDocumentSource::new(pool));
        let client = Arc::new(client);

        let resolver = Arc::new(SourceResolver::new(documents.clone(), "doc_"));
        let cache = CacheStore::new(kv.clone());
        let lock = JobLock::new(kv.clone(), LOCK_TTL);
        let progress = ProgressLog::new(kv, PROGRESS_TTL);
        let ids = Arc::new(SequentialIdProvider::default());

        let orchestrator = Arc::new(JobOrchestrator::new(
            resolver.clone(),
            client.clone(),
            cache.clone(),
            lock.clone(),
            progress.clone(),
            clock.clone(),
            ids.clone(),
            JobSettings {
                model: "test-model".to_string(),
                chunk_max_len,
                inter_chunk_delay: Duration::ZERO,
            },
        ));

        Self {
            clock,
            documents,
            maintenance,
            client,
            cache,
            lock,
            progress,
            resolver,
            ids,
            orchestrator,
        }
    }

    pub async fn with_default_client() -> Self {
        Self::new(MockTranslationClient::new(), 12_000).await
    }

    pub async fn put_source(&self, key: &str, content: &str) {
        self.documents
            .upsert(&SourceDocument::new(key, content))
            .await
            .unwrap();
    }

    /// Render service backed by the real deferred scheduler
    pub fn render_service(&self, deferred_delay: Duration) -> (RenderService, Arc<DeferredScheduler>) {
        let scheduler = Arc::new(DeferredScheduler::new(self.orchestrator.clone()));
        let service = RenderService::new(
            self.resolver.clone(),
            self.cache.clone(),
            self.lock.clone(),
            scheduler.clone(),
            self.ids.clone(),
            deferred_delay,
        );
        (service, scheduler)
    }

    pub fn status_service(&self) -> StatusService {
        StatusService::new(self.resolver.clone(), self.cache.clone(), self.lock.clone())
    }
}

/// HTML made of `count` paragraphs of `body_len` filler bytes each
pub fn paragraphs(count: usize, body_len: usize) -> String {
    (0..count)
        .map(|i| format!("<p>{}{}</p>", i % 10, "x".repeat(body_len)))
        .collect()
}

// Status Overview - per document and target language, for operators

use super::cache_store::CacheStore;
use super::job_lock::JobLock;
use super::resolver::SourceResolver;
use crate::domain::{DocumentKey, Fingerprint, TranslationRequest, TranslationStatus};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusQuery {
    pub document_types: Vec<String>,
    pub source_lang: String,
    #[serde(default)]
    pub country: Option<String>,
    pub target_langs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStatus {
    pub target_lang: String,
    #[serde(flatten)]
    pub status: TranslationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStatus {
    pub document_type: String,
    /// Store key the source resolved to; `None` when there is no source
    pub source_key: Option<String>,
    pub source_len: usize,
    pub created_at: Option<i64>,
    pub fingerprint: Option<String>,
    /// Empty when the source is missing
    pub translations: Vec<LanguageStatus>,
}

pub struct StatusService {
    resolver: Arc<SourceResolver>,
    cache: CacheStore,
    lock: JobLock,
}

impl StatusService {
    pub fn new(resolver: Arc<SourceResolver>, cache: CacheStore, lock: JobLock) -> Self {
        Self {
            resolver,
            cache,
            lock,
        }
    }

    pub async fn overview(&self, query: &StatusQuery) -> Result<Vec<DocumentStatus>> {
        let mut rows = Vec::with_capacity(query.document_types.len());

        for document_type in &query.document_types {
            let probe = TranslationRequest::new(
                document_type.as_str(),
                query.source_lang.as_str(),
                query.country.as_deref(),
                // Target is irrelevant for source resolution
                query.source_lang.as_str(),
            );
            probe.validate()?;

            let Some(source) = self.resolver.resolve(&probe).await? else {
                rows.push(DocumentStatus {
                    document_type: document_type.clone(),
                    source_key: None,
                    source_len: 0,
                    created_at: None,
                    fingerprint: None,
                    translations: Vec::new(),
                });
                continue;
            };

            let fingerprint = Fingerprint::of(&source.content);
            let mut translations = Vec::with_capacity(query.target_langs.len());
            for target_lang in &query.target_langs {
                let key = DocumentKey::new(document_type.as_str(), target_lang.as_str());
                key.validate()?;
                let record = self.cache.get(&key).await?;
                let lock_held = self.lock.is_held(&key).await?;
                translations.push(LanguageStatus {
                    target_lang: target_lang.clone(),
                    status: TranslationStatus::evaluate(record.as_ref(), &fingerprint, lock_held),
                });
            }

            rows.push(DocumentStatus {
                document_type: document_type.clone(),
                source_key: Some(source.key),
                source_len: source.content.len(),
                created_at: source.created_at,
                fingerprint: Some(fingerprint.to_string()),
                translations,
            });
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::constants::LOCK_TTL;
    use crate::domain::TranslationRecord;
    use crate::port::document_source::mocks::InMemoryDocumentSource;
    use crate::port::kv_store::memory::InMemoryKeyValueStore;
    use crate::port::time_provider::mocks::ManualTimeProvider;

    #[tokio::test]
    async fn test_overview_reports_every_state() {
        let kv = Arc::new(InMemoryKeyValueStore::new(Arc::new(ManualTimeProvider::new(0))));
        let docs = Arc::new(InMemoryDocumentSource::new());
        docs.insert("doc_de_CH_impressum", "<p>Impressum</p>");
        let cache = CacheStore::new(kv.clone());
        let lock = JobLock::new(kv, LOCK_TTL);
        let service = StatusService::new(
            Arc::new(SourceResolver::new(docs, "doc_")),
            cache.clone(),
            lock.clone(),
        );

        let fp = Fingerprint::of("<p>Impressum</p>");
        cache
            .put(
                &DocumentKey::new("impressum", "en"),
                &TranslationRecord::new(fp.clone(), "<p>Imprint</p>", 10),
            )
            .await
            .unwrap();
        cache
            .put(
                &DocumentKey::new("impressum", "fr"),
                &TranslationRecord::new(Fingerprint::of("old"), "<p>Mentions</p>", 5),
            )
            .await
            .unwrap();
        lock.try_acquire(&DocumentKey::new("impressum", "uk"), "run-1")
            .await
            .unwrap();

        let query = StatusQuery {
            document_types: vec!["agb_imprint".to_string(), "agb".to_string()],
            source_lang: "de".to_string(),
            country: Some("CH".to_string()),
            target_langs: vec!["en".into(), "fr".into(), "it".into(), "uk".into()],
        };
        let rows = service.overview(&query).await.unwrap();

        assert_eq!(rows.len(), 2);
        let imprint = &rows[0];
        assert_eq!(imprint.source_key.as_deref(), Some("doc_de_CH_impressum"));
        assert_eq!(imprint.fingerprint.as_deref(), Some(fp.as_str()));
        let statuses: Vec<&str> = imprint.translations.iter().map(|t| t.status.label()).collect();
        // Records are keyed by the requested type, not the alias target
        assert_eq!(statuses, vec!["missing", "missing", "missing", "missing"]);

        assert!(rows[1].source_key.is_none());
        assert!(rows[1].translations.is_empty());

        let query = StatusQuery {
            document_types: vec!["impressum".to_string()],
            ..query
        };
        let rows = service.overview(&query).await.unwrap();
        let statuses: Vec<&str> = rows[0].translations.iter().map(|t| t.status.label()).collect();
        assert_eq!(statuses, vec!["up_to_date", "stale", "missing", "processing"]);
    }
}

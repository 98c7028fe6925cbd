// Source Resolver - locate the canonical document for a request

use crate::domain::{SourceDocument, TranslationRequest};
use crate::error::Result;
use crate::port::DocumentSource;
use std::sync::Arc;
use tracing::{debug, warn};

/// Public document-type names mapped to the names documents are stored under
const TYPE_ALIASES: [(&str, &str); 4] = [
    ("agb_imprint", "impressum"),
    ("agb_terms", "agb"),
    ("agb_privacy", "datenschutz"),
    ("agb_revocation", "widerruf"),
];

/// Storage name for a document type
pub fn canonical_type(document_type: &str) -> &str {
    TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == document_type)
        .map_or(document_type, |(_, real)| *real)
}

pub struct SourceResolver {
    source: Arc<dyn DocumentSource>,
    prefix: String,
}

impl SourceResolver {
    pub fn new(source: Arc<dyn DocumentSource>, prefix: impl Into<String>) -> Self {
        Self {
            source,
            prefix: prefix.into(),
        }
    }

    /// Store keys tried in order, most specific first
    pub fn candidate_keys(&self, request: &TranslationRequest) -> Vec<String> {
        let p = &self.prefix;
        let doc_type = canonical_type(&request.document_type);
        let lang = &request.source_lang;

        let mut keys = Vec::with_capacity(4);
        if let Some(country) = request.country() {
            let country = country.to_uppercase();
            keys.push(format!("{p}{lang}_{country}_{doc_type}"));
            keys.push(format!("{p}{doc_type}_{lang}_{country}"));
        }
        keys.push(format!("{p}{lang}_{doc_type}"));
        keys.push(format!("{p}{doc_type}_{lang}"));
        keys
    }

    /// Resolve the source document, falling back to a suffix scan of all keys
    pub async fn resolve(&self, request: &TranslationRequest) -> Result<Option<SourceDocument>> {
        for key in self.candidate_keys(request) {
            if let Some(doc) = self.source.get(&key).await? {
                debug!(key = %key, "Resolved source document");
                return Ok(Some(doc));
            }
        }

        let doc_type = canonical_type(&request.document_type);
        let fallback = self
            .source
            .list_keys()
            .await?
            .into_iter()
            .find(|key| key.ends_with(doc_type));

        match fallback {
            Some(key) => {
                warn!(
                    document_type = %request.document_type,
                    key = %key,
                    "No candidate key matched; using suffix fallback"
                );
                self.source.get(&key).await
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::document_source::mocks::InMemoryDocumentSource;

    fn resolver(docs: &[(&str, &str)]) -> SourceResolver {
        let source = InMemoryDocumentSource::new();
        for (key, content) in docs {
            source.insert(key, content);
        }
        SourceResolver::new(Arc::new(source), "doc_")
    }

    #[test]
    fn test_candidate_order_with_country() {
        let r = resolver(&[]);
        let req = TranslationRequest::new("agb_imprint", "de", Some("ch"), "fr");
        assert_eq!(
            r.candidate_keys(&req),
            vec![
                "doc_de_CH_impressum",
                "doc_impressum_de_CH",
                "doc_de_impressum",
                "doc_impressum_de",
            ]
        );
    }

    #[test]
    fn test_candidate_order_without_country() {
        let r = resolver(&[]);
        let req = TranslationRequest::new("agb", "de", None, "fr");
        assert_eq!(r.candidate_keys(&req), vec!["doc_de_agb", "doc_agb_de"]);
    }

    #[tokio::test]
    async fn test_first_candidate_wins() {
        let r = resolver(&[
            ("doc_de_impressum", "generic"),
            ("doc_impressum_de_CH", "swiss"),
        ]);
        let req = TranslationRequest::new("impressum", "de", Some("CH"), "fr");
        let doc = r.resolve(&req).await.unwrap().unwrap();
        assert_eq!(doc.key, "doc_impressum_de_CH");
        assert_eq!(doc.content, "swiss");
    }

    #[tokio::test]
    async fn test_suffix_fallback() {
        let r = resolver(&[("legacy_store_widerruf", "<p>W</p>")]);
        let req = TranslationRequest::new("agb_revocation", "de", Some("CH"), "en");
        let doc = r.resolve(&req).await.unwrap().unwrap();
        assert_eq!(doc.key, "legacy_store_widerruf");
    }

    #[tokio::test]
    async fn test_unknown_document_is_none() {
        let r = resolver(&[("doc_de_agb", "x")]);
        let req = TranslationRequest::new("datenschutz", "de", None, "en");
        assert!(r.resolve(&req).await.unwrap().is_none());
    }
}

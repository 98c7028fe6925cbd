// Document Source Port (Interface)

use crate::domain::SourceDocument;
use crate::error::Result;
use async_trait::async_trait;

/// Read-only access to the canonical source documents
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch a document by its exact store key
    async fn get(&self, key: &str) -> Result<Option<SourceDocument>>;

    /// All store keys, in a stable order
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Write side of the document store, used for seeding
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Insert or replace a document
    ///
    /// # Returns
    /// `true` if the key was new
    async fn upsert(&self, doc: &SourceDocument) -> Result<bool>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Ordered map standing in for the document store
    #[derive(Default)]
    pub struct InMemoryDocumentSource {
        docs: Mutex<BTreeMap<String, SourceDocument>>,
    }

    impl InMemoryDocumentSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, key: &str, content: &str) {
            self.docs
                .lock()
                .unwrap()
                .insert(key.to_string(), SourceDocument::new(key, content));
        }

        pub fn remove(&self, key: &str) {
            self.docs.lock().unwrap().remove(key);
        }
    }

    #[async_trait]
    impl DocumentSource for InMemoryDocumentSource {
        async fn get(&self, key: &str) -> Result<Option<SourceDocument>> {
            Ok(self.docs.lock().unwrap().get(key).cloned())
        }

        async fn list_keys(&self) -> Result<Vec<String>> {
            Ok(self.docs.lock().unwrap().keys().cloned().collect())
        }
    }

    #[async_trait]
    impl DocumentWriter for InMemoryDocumentSource {
        async fn upsert(&self, doc: &SourceDocument) -> Result<bool> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .insert(doc.key.clone(), doc.clone())
                .is_none())
        }
    }
}

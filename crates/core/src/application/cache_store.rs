// Cache Store - translation records keyed by DocumentKey

use crate::domain::{DocumentKey, TranslationRecord};
use crate::error::Result;
use crate::port::{KeyValueStore, Namespace};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Current record, if any. An unreadable record is treated as a miss.
    pub async fn get(&self, key: &DocumentKey) -> Result<Option<TranslationRecord>> {
        let Some(raw) = self.kv.get(Namespace::Cache, &key.storage_key()).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable cache record");
                Ok(None)
            }
        }
    }

    /// Overwrite the record in a single write
    pub async fn put(&self, key: &DocumentKey, record: &TranslationRecord) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        self.kv
            .put(Namespace::Cache, &key.storage_key(), &raw, None)
            .await
    }

    pub async fn invalidate(&self, key: &DocumentKey) -> Result<bool> {
        self.kv.delete(Namespace::Cache, &key.storage_key()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Fingerprint;
    use crate::port::kv_store::memory::InMemoryKeyValueStore;
    use crate::port::time_provider::mocks::ManualTimeProvider;

    fn setup() -> (Arc<InMemoryKeyValueStore>, CacheStore) {
        let kv = Arc::new(InMemoryKeyValueStore::new(Arc::new(ManualTimeProvider::new(0))));
        (kv.clone(), CacheStore::new(kv))
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (_kv, cache) = setup();
        let key = DocumentKey::new("agb", "en");
        let record = TranslationRecord::new(Fingerprint::of("src"), "<p>Terms</p>", 42);

        cache.put(&key, &record).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(record));
        assert_eq!(cache.get(&DocumentKey::new("agb", "fr")).await.unwrap(), None);

        assert!(cache.invalidate(&key).await.unwrap());
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_miss() {
        let (kv, cache) = setup();
        let key = DocumentKey::new("agb", "en");
        kv.put(Namespace::Cache, &key.storage_key(), "{not json", None)
            .await
            .unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), None);
    }
}

// Key-Value Store Port (Interface)
//
// Backs the cache, the job lock, the progress log and the terminal result.
// Values are opaque strings; typed wrappers in the application layer own the
// serialization.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Logical partition of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Translation records, never expire
    Cache,
    /// Job locks
    Lock,
    /// Ephemeral progress lines
    Progress,
    /// Terminal job results
    Result,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Cache,
        Namespace::Lock,
        Namespace::Progress,
        Namespace::Result,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Cache => "cache",
            Namespace::Lock => "lock",
            Namespace::Progress => "progress",
            Namespace::Result => "result",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespaced key-value storage with optional expiry.
///
/// An entry whose TTL has elapsed is treated as absent by every operation.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a live entry
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<String>>;

    /// Unconditional overwrite; `ttl = None` never expires
    async fn put(&self, ns: Namespace, key: &str, value: &str, ttl: Option<Duration>)
        -> Result<()>;

    /// Atomic set-if-absent.
    ///
    /// # Returns
    /// `true` if this call created the entry, `false` if a live entry already existed
    async fn put_if_absent(
        &self,
        ns: Namespace,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    /// Remove an entry; returns whether a live entry was removed
    async fn delete(&self, ns: Namespace, key: &str) -> Result<bool>;

    /// Remove an entry only while it still holds `expected`.
    ///
    /// # Returns
    /// `true` if a live entry with that value was removed
    async fn delete_if(&self, ns: Namespace, key: &str, expected: &str) -> Result<bool>;

    /// Atomic read-and-delete. At most one caller observes a given value.
    async fn take(&self, ns: Namespace, key: &str) -> Result<Option<String>>;
}

/// Deadline in epoch ms for an entry written at `now_millis`
pub fn expiry_millis(now_millis: i64, ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_millis.saturating_add(ttl.as_millis() as i64))
}

// ============================================================================
// In-memory implementation (tests and ephemeral deployments)
// ============================================================================

pub mod memory {
    use super::*;
    use crate::port::TimeProvider;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct Entry {
        value: String,
        expires_at: Option<i64>,
    }

    impl Entry {
        fn is_live(&self, now: i64) -> bool {
            self.expires_at.map_or(true, |deadline| deadline > now)
        }
    }

    /// Mutex-guarded map; every operation is atomic with respect to the others
    pub struct InMemoryKeyValueStore {
        entries: Mutex<HashMap<(Namespace, String), Entry>>,
        time: Arc<dyn TimeProvider>,
    }

    impl InMemoryKeyValueStore {
        pub fn new(time: Arc<dyn TimeProvider>) -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
                time,
            }
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(Namespace, String), Entry>>> {
            self.entries
                .lock()
                .map_err(|_| crate::AppError::Internal("kv store mutex poisoned".to_string()))
        }

        /// Synchronous read, for observing the store from inside another call
        pub fn peek(&self, ns: Namespace, key: &str) -> Option<String> {
            let now = self.time.now_millis();
            let entries = self.entries.lock().ok()?;
            entries
                .get(&(ns, key.to_string()))
                .filter(|e| e.is_live(now))
                .map(|e| e.value.clone())
        }

        /// Number of stored entries in `ns`, expired ones included
        pub fn raw_len(&self, ns: Namespace) -> usize {
            self.entries
                .lock()
                .map(|entries| entries.keys().filter(|(n, _)| *n == ns).count())
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl KeyValueStore for InMemoryKeyValueStore {
        async fn get(&self, ns: Namespace, key: &str) -> Result<Option<String>> {
            let now = self.time.now_millis();
            let entries = self.lock()?;
            Ok(entries
                .get(&(ns, key.to_string()))
                .filter(|e| e.is_live(now))
                .map(|e| e.value.clone()))
        }

        async fn put(
            &self,
            ns: Namespace,
            key: &str,
            value: &str,
            ttl: Option<Duration>,
        ) -> Result<()> {
            let now = self.time.now_millis();
            self.lock()?.insert(
                (ns, key.to_string()),
                Entry {
                    value: value.to_string(),
                    expires_at: expiry_millis(now, ttl),
                },
            );
            Ok(())
        }

        async fn put_if_absent(
            &self,
            ns: Namespace,
            key: &str,
            value: &str,
            ttl: Option<Duration>,
        ) -> Result<bool> {
            let now = self.time.now_millis();
            let mut entries = self.lock()?;
            let slot = (ns, key.to_string());
            if entries.get(&slot).is_some_and(|e| e.is_live(now)) {
                return Ok(false);
            }
            entries.insert(
                slot,
                Entry {
                    value: value.to_string(),
                    expires_at: expiry_millis(now, ttl),
                },
            );
            Ok(true)
        }

        async fn delete(&self, ns: Namespace, key: &str) -> Result<bool> {
            let now = self.time.now_millis();
            let removed = self.lock()?.remove(&(ns, key.to_string()));
            Ok(removed.is_some_and(|e| e.is_live(now)))
        }

        async fn delete_if(&self, ns: Namespace, key: &str, expected: &str) -> Result<bool> {
            let now = self.time.now_millis();
            let mut entries = self.lock()?;
            let slot = (ns, key.to_string());
            if !entries.get(&slot).is_some_and(|e| e.value == expected) {
                return Ok(false);
            }
            let removed = entries.remove(&slot);
            Ok(removed.is_some_and(|e| e.is_live(now)))
        }

        async fn take(&self, ns: Namespace, key: &str) -> Result<Option<String>> {
            let now = self.time.now_millis();
            let removed = self.lock()?.remove(&(ns, key.to_string()));
            Ok(removed.filter(|e| e.is_live(now)).map(|e| e.value))
        }
    }
}

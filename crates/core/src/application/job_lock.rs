// Job Lock - time-bounded mutual exclusion per DocumentKey
//
// The lock value is the run id of its holder, so a run can only ever release
// its own lock.

use crate::domain::DocumentKey;
use crate::error::Result;
use crate::port::{KeyValueStore, Namespace};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct JobLock {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl JobLock {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Atomic set-if-absent on behalf of `owner`; an expired lock counts as absent
    pub async fn try_acquire(&self, key: &DocumentKey, owner: &str) -> Result<bool> {
        let acquired = self
            .kv
            .put_if_absent(Namespace::Lock, &key.storage_key(), owner, Some(self.ttl))
            .await?;
        debug!(key = %key, owner, acquired, "Lock acquire attempt");
        Ok(acquired)
    }

    /// Release the lock if `owner` still holds it.
    ///
    /// # Returns
    /// `false` if the lock expired or was taken over in the meantime
    pub async fn release(&self, key: &DocumentKey, owner: &str) -> Result<bool> {
        let released = self
            .kv
            .delete_if(Namespace::Lock, &key.storage_key(), owner)
            .await?;
        if !released {
            warn!(key = %key, owner, "Lock no longer held by this run; left untouched");
        }
        Ok(released)
    }

    pub async fn is_held(&self, key: &DocumentKey) -> Result<bool> {
        Ok(self.holder(key).await?.is_some())
    }

    pub async fn is_held_by(&self, key: &DocumentKey, owner: &str) -> Result<bool> {
        Ok(self.holder(key).await?.as_deref() == Some(owner))
    }

    /// Run id of the current holder
    pub async fn holder(&self, key: &DocumentKey) -> Result<Option<String>> {
        self.kv.get(Namespace::Lock, &key.storage_key()).await
    }

    /// Break a lock regardless of who holds it
    pub async fn force_release(&self, key: &DocumentKey) -> Result<bool> {
        let broken = self.kv.delete(Namespace::Lock, &key.storage_key()).await?;
        if broken {
            warn!(key = %key, "Force-released a held lock");
        }
        Ok(broken)
    }
}

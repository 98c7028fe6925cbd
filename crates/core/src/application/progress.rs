// Progress Log - per-key log lines and the one-time terminal result

use crate::domain::{DocumentKey, JobResult, ProgressSnapshot};
use crate::error::Result;
use crate::port::{KeyValueStore, Namespace};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ProgressLog {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ProgressLog {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Replace the stored lines with `lines`
    pub async fn publish(&self, key: &DocumentKey, lines: &[String]) -> Result<()> {
        let raw = serde_json::to_string(lines)?;
        self.kv
            .put(Namespace::Progress, &key.storage_key(), &raw, Some(self.ttl))
            .await
    }

    pub async fn lines(&self, key: &DocumentKey) -> Result<Vec<String>> {
        match self.kv.get(Namespace::Progress, &key.storage_key()).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn set_result(&self, key: &DocumentKey, result: &JobResult) -> Result<()> {
        let raw = serde_json::to_string(result)?;
        self.kv
            .put(Namespace::Result, &key.storage_key(), &raw, Some(self.ttl))
            .await
    }

    /// Claim the terminal result; only one caller ever gets it
    pub async fn take_result(&self, key: &DocumentKey) -> Result<Option<JobResult>> {
        match self.kv.take(Namespace::Result, &key.storage_key()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn clear_lines(&self, key: &DocumentKey) -> Result<()> {
        self.kv.delete(Namespace::Progress, &key.storage_key()).await?;
        Ok(())
    }

    /// Drop lines and any undelivered result
    pub async fn clear(&self, key: &DocumentKey) -> Result<()> {
        self.clear_lines(key).await?;
        self.kv.delete(Namespace::Result, &key.storage_key()).await?;
        Ok(())
    }

    /// What a poller sees: the terminal result exactly once, otherwise the lines so far
    pub async fn snapshot(&self, key: &DocumentKey) -> Result<ProgressSnapshot> {
        if let Some(result) = self.take_result(key).await? {
            return Ok(ProgressSnapshot::Done { result });
        }
        Ok(ProgressSnapshot::Running {
            logs: self.lines(key).await?,
        })
    }
}

// DB Maintenance port
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Database maintenance statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub cache_entries: i64,
    pub lock_entries: i64,
    pub progress_entries: i64,
    pub result_entries: i64,
    /// Rows past their TTL that no read has cleaned up yet
    pub expired_entries: i64,
    pub source_documents: i64,
    pub fragmentation_percent: f64,
}

/// Maintenance configuration
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Maximum DB size before forcing VACUUM (MB)
    pub max_db_size_mb: f64,

    /// Fragmentation above which VACUUM runs regardless of size
    pub max_fragmentation_percent: f64,

    /// Always VACUUM (manual trigger)
    pub force_vacuum: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            max_db_size_mb: 500.0,
            max_fragmentation_percent: 30.0,
            force_vacuum: false,
        }
    }
}

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceReport {
    pub purged_entries: i64,
    pub reclaimed_mb: f64,
    pub stats: MaintenanceStats,
}

/// Database maintenance operations
#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Run VACUUM to reclaim space and optimize DB
    ///
    /// # Returns
    /// Space reclaimed in MB
    async fn vacuum(&self) -> Result<f64>;

    /// Delete lock/progress/result rows whose TTL has elapsed
    ///
    /// # Returns
    /// Number of rows deleted
    async fn purge_expired(&self) -> Result<i64>;

    /// Get maintenance statistics
    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// Run full maintenance (purge + conditional VACUUM)
    async fn run_full_maintenance(&self, config: &MaintenanceConfig) -> Result<MaintenanceReport> {
        let stats_before = self.get_stats().await?;

        let purged_entries = self.purge_expired().await?;

        let needs_vacuum = config.force_vacuum
            || stats_before.db_size_mb > config.max_db_size_mb
            || stats_before.fragmentation_percent > config.max_fragmentation_percent;
        let reclaimed_mb = if needs_vacuum { self.vacuum().await? } else { 0.0 };

        let stats = self.get_stats().await?;

        tracing::info!(
            purged_entries = purged_entries,
            reclaimed_mb = reclaimed_mb,
            db_size_mb = stats.db_size_mb,
            "Maintenance completed"
        );

        Ok(MaintenanceReport {
            purged_entries,
            reclaimed_mb,
            stats,
        })
    }
}

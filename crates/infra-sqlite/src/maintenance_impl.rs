// SQLite Maintenance Implementation
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use transcache_core::error::Result;
use transcache_core::port::{Maintenance, MaintenanceStats, Namespace, TimeProvider};

/// SQLite maintenance implementation
pub struct SqliteMaintenance {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// (page_count, page_size, freelist_count)
    async fn page_info(&self) -> Result<(i64, i64, i64)> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let freelist_count: i64 = sqlx::query_scalar("PRAGMA freelist_count")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok((page_count, page_size, freelist_count))
    }

    async fn get_db_size_mb(&self) -> Result<f64> {
        let (page_count, page_size, _) = self.page_info().await?;
        Ok((page_count * page_size) as f64 / (1024.0 * 1024.0))
    }
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        info!("Running VACUUM to optimize database...");

        let size_before = self.get_db_size_mb().await?;

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let size_after = self.get_db_size_mb().await?;
        let reclaimed = (size_before - size_after).max(0.0);

        info!(
            size_before_mb = size_before,
            size_after_mb = size_after,
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );

        Ok(reclaimed)
    }

    async fn purge_expired(&self) -> Result<i64> {
        let now = self.time_provider.now_millis();

        let result =
            sqlx::query("DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected() as i64;
        info!(deleted_entries = deleted, "Expired entry purge completed");
        Ok(deleted)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let now = self.time_provider.now_millis();
        let (page_count, page_size, freelist_count) = self.page_info().await?;

        let per_namespace: Vec<(String, i64)> =
            sqlx::query_as("SELECT namespace, COUNT(*) FROM kv_entries GROUP BY namespace")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        let count_of = |ns: Namespace| {
            per_namespace
                .iter()
                .find(|(name, _)| name == ns.as_str())
                .map_or(0, |(_, count)| *count)
        };

        let expired_entries: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let source_documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM source_documents")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let db_size_bytes = page_count * page_size;
        let fragmentation_percent = if page_count > 0 {
            freelist_count as f64 / page_count as f64 * 100.0
        } else {
            0.0
        };

        Ok(MaintenanceStats {
            db_size_mb: db_size_bytes as f64 / (1024.0 * 1024.0),
            db_size_bytes,
            cache_entries: count_of(Namespace::Cache),
            lock_entries: count_of(Namespace::Lock),
            progress_entries: count_of(Namespace::Progress),
            result_entries: count_of(Namespace::Result),
            expired_entries,
            source_documents,
            fragmentation_percent,
        })
    }
}

// SQLite KeyValueStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use transcache_core::error::Result;
use transcache_core::port::kv_store::expiry_millis;
use transcache_core::port::{KeyValueStore, Namespace, TimeProvider};

pub struct SqliteKeyValueStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    fn is_live(&self, expires_at: Option<i64>) -> bool {
        expires_at.map_or(true, |deadline| deadline > self.time_provider.now_millis())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<String>> {
        let now = self.time_provider.now_millis();

        sqlx::query_scalar(
            r#"
            SELECT value FROM kv_entries
            WHERE namespace = ? AND key = ?
            AND (expires_at IS NULL OR expires_at > ?)
            "#,
        )
        .bind(ns.as_str())
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn put(
        &self,
        ns: Namespace,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let expires_at = expiry_millis(self.time_provider.now_millis(), ttl);

        sqlx::query(
            r#"
            INSERT INTO kv_entries (namespace, key, value, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (namespace, key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(ns.as_str())
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn put_if_absent(
        &self,
        ns: Namespace,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let expires_at = expiry_millis(now, ttl);

        // One statement: insert, or take over the row only if it has expired
        let result = sqlx::query(
            r#"
            INSERT INTO kv_entries (namespace, key, value, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (namespace, key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            WHERE kv_entries.expires_at IS NOT NULL
            AND kv_entries.expires_at <= ?5
            "#,
        )
        .bind(ns.as_str())
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, ns: Namespace, key: &str) -> Result<bool> {
        let removed: Option<Option<i64>> = sqlx::query_scalar(
            "DELETE FROM kv_entries WHERE namespace = ? AND key = ? RETURNING expires_at",
        )
        .bind(ns.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(removed.is_some_and(|expires_at| self.is_live(expires_at)))
    }

    async fn delete_if(&self, ns: Namespace, key: &str, expected: &str) -> Result<bool> {
        let removed: Option<Option<i64>> = sqlx::query_scalar(
            "DELETE FROM kv_entries WHERE namespace = ? AND key = ? AND value = ? RETURNING expires_at",
        )
        .bind(ns.as_str())
        .bind(key)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(removed.is_some_and(|expires_at| self.is_live(expires_at)))
    }

    async fn take(&self, ns: Namespace, key: &str) -> Result<Option<String>> {
        let removed: Option<(String, Option<i64>)> = sqlx::query_as(
            "DELETE FROM kv_entries WHERE namespace = ? AND key = ? RETURNING value, expires_at",
        )
        .bind(ns.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(removed
            .filter(|(_, expires_at)| self.is_live(*expires_at))
            .map(|(value, _)| value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use transcache_core::port::time_provider::mocks::ManualTimeProvider;

    async fn setup() -> (Arc<ManualTimeProvider>, SqliteKeyValueStore) {
        let pool = create_pool(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let clock = Arc::new(ManualTimeProvider::new(1_000_000));
        (clock.clone(), SqliteKeyValueStore::new(pool, clock))
    }

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let (_clock, store) = setup().await;

        tokio_test::assert_ok!(store.put(Namespace::Cache, "agb:en", "one", None).await);
        store.put(Namespace::Cache, "agb:en", "two", None).await.unwrap();

        assert_eq!(
            store.get(Namespace::Cache, "agb:en").await.unwrap().as_deref(),
            Some("two")
        );
        assert_eq!(store.get(Namespace::Lock, "agb:en").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_if_absent_only_wins_once() {
        let (_clock, store) = setup().await;
        let ttl = Some(Duration::from_secs(1800));

        assert!(store.put_if_absent(Namespace::Lock, "agb:en", "run-1", ttl).await.unwrap());
        assert!(!store.put_if_absent(Namespace::Lock, "agb:en", "run-2", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_if_leaves_other_owner_alone() {
        let (clock, store) = setup().await;
        let ttl = Some(Duration::from_secs(1800));

        assert!(store.put_if_absent(Namespace::Lock, "agb:en", "run-1", ttl).await.unwrap());
        clock.advance_millis(1_800_000);
        assert!(store.put_if_absent(Namespace::Lock, "agb:en", "run-2", ttl).await.unwrap());

        // The expired holder cannot remove its successor's entry
        assert!(!store.delete_if(Namespace::Lock, "agb:en", "run-1").await.unwrap());
        assert_eq!(
            store.get(Namespace::Lock, "agb:en").await.unwrap().as_deref(),
            Some("run-2")
        );

        assert!(store.delete_if(Namespace::Lock, "agb:en", "run-2").await.unwrap());
        assert_eq!(store.get(Namespace::Lock, "agb:en").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_if_absent_takes_over_expired_entry() {
        let (clock, store) = setup().await;
        let ttl = Some(Duration::from_secs(1800));

        assert!(store.put_if_absent(Namespace::Lock, "agb:en", "a", ttl).await.unwrap());
        clock.advance_millis(1_800_000);

        assert_eq!(store.get(Namespace::Lock, "agb:en").await.unwrap(), None);
        assert!(store.put_if_absent(Namespace::Lock, "agb:en", "b", ttl).await.unwrap());
        assert_eq!(
            store.get(Namespace::Lock, "agb:en").await.unwrap().as_deref(),
            Some("b")
        );
    }

    #[tokio::test]
    async fn test_permanent_entry_is_never_taken_over() {
        let (clock, store) = setup().await;
        store.put(Namespace::Cache, "k", "kept", None).await.unwrap();
        clock.advance_millis(10_000_000);

        assert!(!store.put_if_absent(Namespace::Cache, "k", "new", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_take_and_delete() {
        let (clock, store) = setup().await;
        let ttl = Some(Duration::from_secs(60));

        store.put(Namespace::Result, "k", "done", ttl).await.unwrap();
        assert_eq!(store.take(Namespace::Result, "k").await.unwrap().as_deref(), Some("done"));
        assert_eq!(store.take(Namespace::Result, "k").await.unwrap(), None);

        store.put(Namespace::Result, "k", "late", ttl).await.unwrap();
        clock.advance_millis(60_000);
        // Expired values are removed but not delivered
        assert_eq!(store.take(Namespace::Result, "k").await.unwrap(), None);

        store.put(Namespace::Progress, "k", "[]", ttl).await.unwrap();
        assert!(store.delete(Namespace::Progress, "k").await.unwrap());
        assert!(!store.delete(Namespace::Progress, "k").await.unwrap());
    }
}

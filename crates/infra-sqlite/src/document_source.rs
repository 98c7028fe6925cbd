// SQLite DocumentSource Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::info;
use transcache_core::domain::SourceDocument;
use transcache_core::error::Result;
use transcache_core::port::{DocumentSource, DocumentWriter};

/// Source documents stored in the `source_documents` table
pub struct SqliteDocumentSource {
    pool: SqlitePool,
}

impl SqliteDocumentSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentWriter for SqliteDocumentSource {
    async fn upsert(&self, doc: &SourceDocument) -> Result<bool> {
        let existed: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM source_documents WHERE key = ?")
                .bind(&doc.key)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO source_documents (key, content, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                content = excluded.content,
                created_at = excluded.created_at
            "#,
        )
        .bind(&doc.key)
        .bind(&doc.content)
        .bind(doc.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        info!(key = %doc.key, len = doc.content.len(), "Source document stored");
        Ok(existed == 0)
    }
}

#[async_trait]
impl DocumentSource for SqliteDocumentSource {
    async fn get(&self, key: &str) -> Result<Option<SourceDocument>> {
        let row: Option<(String, String, Option<i64>)> = sqlx::query_as(
            "SELECT key, content, created_at FROM source_documents WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|(key, content, created_at)| SourceDocument {
            key,
            content,
            created_at,
        }))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT key FROM source_documents ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn setup() -> SqliteDocumentSource {
        let pool = create_pool(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteDocumentSource::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let source = setup().await;
        let doc = SourceDocument::new("doc_de_agb", "<p>AGB</p>").with_created_at(42);

        assert!(source.upsert(&doc).await.unwrap());
        assert_eq!(source.get("doc_de_agb").await.unwrap(), Some(doc));

        let changed = SourceDocument::new("doc_de_agb", "<p>AGB v2</p>");
        assert!(!source.upsert(&changed).await.unwrap());
        let stored = source.get("doc_de_agb").await.unwrap().unwrap();
        assert_eq!(stored.content, "<p>AGB v2</p>");
        assert_eq!(stored.created_at, None);

        assert_eq!(source.get("doc_de_missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_keys_is_sorted() {
        let source = setup().await;
        for key in ["doc_fr_agb", "doc_de_agb", "doc_de_CH_impressum"] {
            source.upsert(&SourceDocument::new(key, "x")).await.unwrap();
        }

        assert_eq!(
            source.list_keys().await.unwrap(),
            vec!["doc_de_CH_impressum", "doc_de_agb", "doc_fr_agb"]
        );
    }
}

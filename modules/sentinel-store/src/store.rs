//! RawStore — idempotent persistent queue of [`RawItem`]s, per §4.2.
//!
//! Rows are keyed by `external_id`; a second `upsert` of the same item is a
//! no-op. The store auto-creates its table on first use.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sentinel_adapters::RawItem;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

const ENSURE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS raw_items (
    id UUID PRIMARY KEY,
    source_adapter TEXT NOT NULL,
    external_id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT,
    summary TEXT,
    authors JSONB NOT NULL DEFAULT '[]',
    published_at TIMESTAMPTZ,
    source_url TEXT,
    metadata JSONB NOT NULL DEFAULT '{}',
    processed BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const UPSERT_SQL: &str = r#"
INSERT INTO raw_items
    (id, source_adapter, external_id, title, content, summary, authors, published_at, source_url, metadata)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (external_id) DO NOTHING
"#;

const SELECT_UNPROCESSED_SQL: &str = r#"
SELECT id, source_adapter, external_id, title, content, summary, authors,
       published_at, source_url, metadata, processed, created_at
FROM raw_items
WHERE processed = FALSE
ORDER BY created_at ASC
LIMIT $1
"#;

const MARK_PROCESSED_SQL: &str = "UPDATE raw_items SET processed = TRUE WHERE id = $1";

/// A persisted [`RawItem`] plus bookkeeping fields, per §3 "RawRow".
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawRow {
    pub id: Uuid,
    pub source_adapter: String,
    pub external_id: String,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub authors: Value,
    pub published_at: Option<DateTime<Utc>>,
    pub source_url: Option<String>,
    pub metadata: Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl RawRow {
    pub fn into_raw_item(self) -> RawItem {
        let authors = serde_json::from_value(self.authors).unwrap_or_default();
        let metadata = serde_json::from_value(self.metadata).unwrap_or_default();
        RawItem {
            source_adapter: self.source_adapter,
            external_id: self.external_id,
            title: self.title,
            content: self.content,
            summary: self.summary,
            authors,
            published_at: self.published_at,
            source_url: self.source_url,
            metadata,
        }
    }
}

#[derive(Clone)]
pub struct RawStore {
    pool: PgPool,
}

impl RawStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and auto-create the table, per §4.2.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPool::connect(dsn).await.context("connecting to raw store")?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(ENSURE_TABLE_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert the item if its `external_id` is new. Returns `true` if a row
    /// was freshly inserted, `false` if it was already present. Idempotent.
    pub async fn upsert(&self, item: &RawItem) -> Result<bool> {
        let id = Uuid::new_v4();
        let authors = serde_json::to_value(&item.authors)?;
        let metadata = serde_json::to_value(&item.metadata)?;

        let result = sqlx::query(UPSERT_SQL)
            .bind(id)
            .bind(&item.source_adapter)
            .bind(&item.external_id)
            .bind(&item.title)
            .bind(&item.content)
            .bind(&item.summary)
            .bind(authors)
            .bind(item.published_at)
            .bind(&item.source_url)
            .bind(metadata)
            .execute(&self.pool)
            .await?;

        let inserted = result.rows_affected() > 0;
        debug!(external_id = %item.external_id, inserted, "raw store upsert");
        Ok(inserted)
    }

    /// Return up to `batch_size` unprocessed rows, oldest first.
    pub async fn select_unprocessed(&self, batch_size: i64) -> Result<Vec<RawRow>> {
        let rows = sqlx::query_as::<_, RawRow>(SELECT_UNPROCESSED_SQL)
            .bind(batch_size)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Mark a row processed. Idempotent.
    pub async fn mark_processed(&self, id: Uuid) -> Result<()> {
        sqlx::query(MARK_PROCESSED_SQL).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn raw_row_round_trips_into_raw_item() {
        let row = RawRow {
            id: Uuid::new_v4(),
            source_adapter: "feed".to_string(),
            external_id: "abc123".to_string(),
            title: "Title".to_string(),
            content: None,
            summary: Some("Summary".to_string()),
            authors: serde_json::json!(["Alice"]),
            published_at: None,
            source_url: None,
            metadata: serde_json::json!({}),
            processed: false,
            created_at: Utc::now(),
        };
        let item = row.into_raw_item();
        assert_eq!(item.authors, vec!["Alice".to_string()]);
        assert_eq!(item.metadata, HashMap::new());
    }
}

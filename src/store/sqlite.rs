//! SQLite-backed [`VectorStore`].
//!
//! Records live in a single `records` table keyed by `(collection, id)`;
//! embeddings are stored as little-endian `f32` BLOBs. Nearest-neighbour
//! queries load every vector of the collection and rank by cosine distance.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::models::{IndexRecord, QueryMatch};
use crate::{db, migrate};

use super::{nearest, VectorStore};

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open the index file at `db_path`, creating it and its schema if needed.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = db::connect(db_path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn ensure_collection(&self, collection: &str) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)")
                .bind(collection)
                .bind(chrono::Utc::now().timestamp())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO records (collection, id, document, source, chunk_index, embedding, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    source = excluded.source,
                    chunk_index = excluded.chunk_index,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(collection)
            .bind(&record.id)
            .bind(&record.document)
            .bind(&record.source)
            .bind(record.chunk_index)
            .bind(vec_to_blob(&record.embedding))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_vec: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryMatch>> {
        let rows = sqlx::query(
            "SELECT id, document, source, chunk_index, embedding FROM records WHERE collection = ?",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.try_get("embedding")?;
            let embedding = blob_to_vec(&blob);
            matches.push(QueryMatch {
                id: row.try_get("id")?,
                document: row.try_get("document")?,
                source: row.try_get("source")?,
                chunk_index: row.try_get("chunk_index")?,
                distance: cosine_distance(query_vec, &embedding),
            });
        }

        Ok(nearest(matches, n_results))
    }

    async fn sources(&self, collection: &str) -> Result<BTreeSet<String>> {
        let sources: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT source FROM records WHERE collection = ?")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;
        Ok(sources.into_iter().collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }

    async fn source_counts(&self, collection: &str) -> Result<Vec<(String, usize)>> {
        let rows = sqlx::query(
            "SELECT source, COUNT(*) AS n FROM records WHERE collection = ? GROUP BY source ORDER BY source",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in &rows {
            let source: String = row.try_get("source")?;
            let n: i64 = row.try_get("n")?;
            counts.push((source, n as usize));
        }
        Ok(counts)
    }

    async fn delete_sources(&self, collection: &str, sources: &[String]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0u64;
        for source in sources {
            deleted += sqlx::query("DELETE FROM records WHERE collection = ? AND source = ?")
                .bind(collection)
                .bind(source)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(deleted as usize)
    }

    async fn clear(&self, collection: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?")
            .bind(collection)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}

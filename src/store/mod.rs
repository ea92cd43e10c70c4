//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the persistence seam: named collections of
//! [`IndexRecord`]s keyed by identifier, with upsert, nearest-neighbour
//! query and source bookkeeping. Two backends are provided:
//!
//! - [`sqlite::SqliteVectorStore`]: persistent, one SQLite file per index.
//! - [`memory::InMemoryVectorStore`]: process-local, for tests.
//!
//! [`Collection`] binds one named collection to an [`Embedder`]: callers
//! hand it text, it computes embeddings and talks to the store. The store
//! itself never computes embeddings.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`ensure_collection`](VectorStore::ensure_collection) | Create a collection unless it exists |
//! | [`upsert`](VectorStore::upsert) | Insert or overwrite records by id |
//! | [`query`](VectorStore::query) | Nearest neighbours by cosine distance |
//! | [`sources`](VectorStore::sources) | Distinct `source` values |
//! | [`source_counts`](VectorStore::source_counts) | Records per source |
//! | [`delete_sources`](VectorStore::delete_sources) | Remove every record of some sources |
//! | [`clear`](VectorStore::clear) | Remove every record |

pub mod memory;
pub mod sqlite;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{ensure, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::embedding::{embed_query, Embedder};
use crate::models::{Chunk, IndexRecord, QueryMatch};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create `collection` if missing. Returns `true` when it was created.
    async fn ensure_collection(&self, collection: &str) -> Result<bool>;

    /// Insert records, overwriting any existing record with the same id.
    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<()>;

    /// Up to `n_results` records closest to `query_vec`, ascending distance.
    async fn query(
        &self,
        collection: &str,
        query_vec: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryMatch>>;

    /// Distinct `source` values present in the collection.
    async fn sources(&self, collection: &str) -> Result<BTreeSet<String>>;

    /// Total number of records in the collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Record count per source, ordered by source.
    async fn source_counts(&self, collection: &str) -> Result<Vec<(String, usize)>>;

    /// Delete every record belonging to `sources`. Returns the number deleted.
    async fn delete_sources(&self, collection: &str, sources: &[String]) -> Result<usize>;

    /// Delete every record in the collection. Returns the number deleted.
    async fn clear(&self, collection: &str) -> Result<usize>;
}

/// A named collection plus the embedding function used to fill and query it.
pub struct Collection {
    name: String,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl Collection {
    /// Open `name`, creating it on first use and reusing it afterwards.
    pub async fn get_or_create(
        name: &str,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
    ) -> Result<Self> {
        if store.ensure_collection(name).await? {
            info!(collection = name, "created collection");
        } else {
            debug!(collection = name, "reusing existing collection");
        }

        Ok(Self {
            name: name.to_string(),
            store,
            embedder,
            batch_size: batch_size.max(1),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Embed `chunks` in batches and upsert them as one write.
    ///
    /// Nothing is written unless every batch embeds successfully.
    pub async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            ensure!(
                vectors.len() == batch.len(),
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            );

            records.extend(batch.iter().zip(vectors).map(|(chunk, embedding)| IndexRecord {
                id: chunk.id.clone(),
                document: chunk.text.clone(),
                source: chunk.source.clone(),
                chunk_index: chunk.chunk_index,
                embedding,
            }));
        }

        self.store.upsert(&self.name, &records).await?;
        Ok(records.len())
    }

    /// Embed `text` and return its nearest neighbours, ascending distance.
    pub async fn query_text(&self, text: &str, n_results: usize) -> Result<Vec<QueryMatch>> {
        let query_vec = embed_query(self.embedder.as_ref(), text).await?;
        self.store.query(&self.name, &query_vec, n_results).await
    }

    pub async fn sources(&self) -> Result<BTreeSet<String>> {
        self.store.sources(&self.name).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count(&self.name).await
    }

    pub async fn source_counts(&self) -> Result<Vec<(String, usize)>> {
        self.store.source_counts(&self.name).await
    }

    pub async fn delete_sources(&self, sources: &[String]) -> Result<usize> {
        if sources.is_empty() {
            return Ok(0);
        }
        self.store.delete_sources(&self.name, sources).await
    }

    pub async fn clear(&self) -> Result<usize> {
        self.store.clear(&self.name).await
    }
}

/// Sort matches by ascending distance, ties broken by id, and keep `n`.
pub(crate) fn nearest(mut matches: Vec<QueryMatch>, n_results: usize) -> Vec<QueryMatch> {
    matches.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    matches.truncate(n_results);
    matches
}

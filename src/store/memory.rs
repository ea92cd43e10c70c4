//! In-memory [`VectorStore`] implementation for tests.
//!
//! Collections are `BTreeMap`s keyed by record id behind a `std::sync::RwLock`.
//! Queries are brute-force cosine distance over every record.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::{IndexRecord, QueryMatch};

use super::{nearest, VectorStore};

type Collections = HashMap<String, BTreeMap<String, IndexRecord>>;

#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<Collections>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, collection: &str) -> Result<bool> {
        let mut collections = self.write()?;
        if collections.contains_key(collection) {
            return Ok(false);
        }
        collections.insert(collection.to_string(), BTreeMap::new());
        Ok(true)
    }

    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<()> {
        let mut collections = self.write()?;
        let records_map = collections.entry(collection.to_string()).or_default();
        for record in records {
            records_map.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_vec: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryMatch>> {
        let collections = self.read()?;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let matches = records
            .values()
            .map(|r| QueryMatch {
                id: r.id.clone(),
                document: r.document.clone(),
                source: r.source.clone(),
                chunk_index: r.chunk_index,
                distance: cosine_distance(query_vec, &r.embedding),
            })
            .collect();
        Ok(nearest(matches, n_results))
    }

    async fn sources(&self, collection: &str) -> Result<BTreeSet<String>> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map(|records| records.values().map(|r| r.source.clone()).collect())
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.read()?;
        Ok(collections.get(collection).map(BTreeMap::len).unwrap_or(0))
    }

    async fn source_counts(&self, collection: &str) -> Result<Vec<(String, usize)>> {
        let collections = self.read()?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        if let Some(records) = collections.get(collection) {
            for r in records.values() {
                *counts.entry(r.source.clone()).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn delete_sources(&self, collection: &str, sources: &[String]) -> Result<usize> {
        let mut collections = self.write()?;
        let Some(records) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = records.len();
        records.retain(|_, r| !sources.contains(&r.source));
        Ok(before - records.len())
    }

    async fn clear(&self, collection: &str) -> Result<usize> {
        let mut collections = self.write()?;
        Ok(collections
            .get_mut(collection)
            .map(|records| {
                let n = records.len();
                records.clear();
                n
            })
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, source: &str, embedding: Vec<f32>) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            document: format!("text of {}", id),
            source: source.to_string(),
            chunk_index: 0,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_ensure_collection_reports_creation_once() {
        let store = InMemoryVectorStore::new();
        assert!(store.ensure_collection("documents").await.unwrap());
        assert!(!store.ensure_collection("documents").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty_not_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.sources("documents").await.unwrap().is_empty());
        assert_eq!(store.count("documents").await.unwrap(), 0);
        assert!(store.query("documents", &[1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let store = InMemoryVectorStore::new();
        store
            .upsert("documents", &[record("a", "x.pdf", vec![1.0, 0.0])])
            .await
            .unwrap();
        let mut updated = record("a", "x.pdf", vec![0.0, 1.0]);
        updated.document = "new text".to_string();
        store.upsert("documents", &[updated]).await.unwrap();

        assert_eq!(store.count("documents").await.unwrap(), 1);
        let hits = store.query("documents", &[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].document, "new text");
    }

    #[tokio::test]
    async fn test_query_returns_ascending_distance() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(
                "documents",
                &[
                    record("far", "a.pdf", vec![-1.0, 0.0]),
                    record("near", "b.pdf", vec![1.0, 0.1]),
                    record("mid", "c.pdf", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store.query("documents", &[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_sources_counts_and_delete() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(
                "documents",
                &[
                    record("1", "a.pdf", vec![1.0]),
                    record("2", "a.pdf", vec![1.0]),
                    record("3", "b.docx", vec![1.0]),
                ],
            )
            .await
            .unwrap();

        let sources = store.sources("documents").await.unwrap();
        assert_eq!(sources.into_iter().collect::<Vec<_>>(), vec!["a.pdf", "b.docx"]);
        assert_eq!(
            store.source_counts("documents").await.unwrap(),
            vec![("a.pdf".to_string(), 2), ("b.docx".to_string(), 1)]
        );

        let deleted = store
            .delete_sources("documents", &["a.pdf".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.clear("documents").await.unwrap(), 1);
        assert_eq!(store.count("documents").await.unwrap(), 0);
    }
}

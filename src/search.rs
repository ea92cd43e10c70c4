//! Retrieval over the indexed collection.
//!
//! One nearest-neighbour query is issued against the collection, then the
//! hits are re-sorted by **descending** `score`. The score is the store's
//! cosine distance, passed through unchanged, so the re-sort puts the least
//! similar of the returned hits first.
//!
//! Retrieval never fails outward: any error is logged and an empty result
//! list is returned.

use anyhow::Result;
use tracing::{debug, error};

use crate::ingest::DocumentIndex;
use crate::models::SearchHit;
use crate::store::Collection;

impl DocumentIndex {
    /// Up to `n_results` passages relevant to `query`, sorted by descending score.
    pub async fn search_relevant_chunks(&self, query: &str, n_results: usize) -> Vec<SearchHit> {
        search_relevant_chunks(self.collection(), query, n_results).await
    }
}

/// Query `collection` and return hits sorted by descending score.
///
/// Returns an empty list on any failure.
pub async fn search_relevant_chunks(
    collection: &Collection,
    query: &str,
    n_results: usize,
) -> Vec<SearchHit> {
    match try_search(collection, query, n_results).await {
        Ok(hits) => hits,
        Err(e) => {
            error!(query, error = %format!("{:#}", e), "search failed");
            Vec::new()
        }
    }
}

async fn try_search(collection: &Collection, query: &str, n_results: usize) -> Result<Vec<SearchHit>> {
    if n_results == 0 {
        return Ok(Vec::new());
    }

    let matches = collection.query_text(query, n_results).await?;
    let mut hits: Vec<SearchHit> = matches.into_iter().map(SearchHit::from).collect();
    sort_by_score_desc(&mut hits);

    debug!(query, hits = hits.len(), "search complete");
    Ok(hits)
}

fn sort_by_score_desc(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

//! Core data models used throughout the indexer.
//!
//! These types represent the documents, chunks, stored records, and search
//! hits that flow through the ingestion and retrieval pipeline.

use std::path::Path;

use serde::Serialize;

/// Name of the single collection that holds every indexed chunk.
pub const COLLECTION_NAME: &str = "documents";

/// Prefix of the lock files office suites leave next to open documents.
pub const LOCK_FILE_PREFIX: &str = "~$";

/// On-disk format of a source document, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Legacy binary word-processor format (`.doc`).
    LegacyBinary,
    /// XML-based word-processor format (`.docx`).
    XmlDocx,
    /// Portable Document Format (`.pdf`).
    Pdf,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 3] = [
        DocumentFormat::LegacyBinary,
        DocumentFormat::XmlDocx,
        DocumentFormat::Pdf,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::LegacyBinary => "doc",
            DocumentFormat::XmlDocx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }

    /// Classify a file name by its extension, ignoring ASCII case.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|f| ext.eq_ignore_ascii_case(f.extension()))
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A chunk of a document's extracted text, ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Content-addressed identifier, see [`crate::chunk::id_for`].
    pub id: String,
    /// File name of the source document.
    pub source: String,
    /// 0-based position of the chunk within its source.
    pub chunk_index: i64,
    pub text: String,
}

/// A persisted chunk record as held by a [`crate::store::VectorStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub document: String,
    pub source: String,
    pub chunk_index: i64,
    pub embedding: Vec<f32>,
}

/// A nearest-neighbour match returned by the store, before ranking.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub id: String,
    pub document: String,
    pub source: String,
    pub chunk_index: i64,
    /// Cosine distance to the query (`1 - cosine similarity`).
    pub distance: f64,
}

/// A search result handed to the generation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub content: String,
    pub source: String,
    pub chunk_index: i64,
    pub score: f64,
}

impl From<QueryMatch> for SearchHit {
    fn from(m: QueryMatch) -> Self {
        SearchHit {
            content: m.document,
            source: m.source,
            chunk_index: m.chunk_index,
            score: m.distance,
        }
    }
}

/// Outcome of a full or incremental indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub files_processed: usize,
    pub chunks_added: usize,
}

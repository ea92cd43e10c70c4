//! Indexing pipeline orchestration.
//!
//! Coordinates the flow for every eligible document: scan → legacy
//! conversion → text extraction → chunking → embedding → upsert. Two entry
//! points share the per-file pipeline:
//!
//! - [`DocumentIndex::index_documents`] processes every eligible file in the
//!   documents directory. Re-processing an indexed file is harmless because
//!   chunk identifiers are deterministic.
//! - [`DocumentIndex::update_documents`] processes only files whose name is
//!   not yet a `source` in the collection.
//!
//! Files are processed one at a time. A failure while processing one file
//! is logged with its full error chain and the run moves on; the returned
//! [`IndexReport`] counts only files that contributed chunks.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::chunk::chunk_document;
use crate::config::{ChunkingConfig, Config};
use crate::convert::{convert_in_place, create_converter, DocumentConverter};
use crate::embedding::create_embedder;
use crate::extract::extract_or_empty;
use crate::models::{DocumentFormat, IndexReport, COLLECTION_NAME};
use crate::scan::{self, DiscoveredFile};
use crate::store::sqlite::SqliteVectorStore;
use crate::store::Collection;

/// A documents directory bound to the collection that indexes it.
pub struct DocumentIndex {
    documents_dir: PathBuf,
    collection: Collection,
    converter: Box<dyn DocumentConverter>,
    chunking: ChunkingConfig,
    n_results: usize,
}

impl DocumentIndex {
    /// Open the persistent index described by `config`.
    ///
    /// The SQLite file and the `documents` collection are created on first
    /// use and reused afterwards, which is what lets [`update_documents`]
    /// pick up where an earlier process left off.
    ///
    /// [`update_documents`]: DocumentIndex::update_documents
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let store = SqliteVectorStore::open(&config.paths.db_path).await?;
        let embedder = create_embedder(&config.embedding)?;
        let collection = Collection::get_or_create(
            COLLECTION_NAME,
            Arc::new(store),
            embedder,
            config.embedding.batch_size,
        )
        .await?;

        Ok(Self::new(
            &config.paths.documents_dir,
            collection,
            create_converter(&config.converter),
            config.chunking.clone(),
            config.retrieval.n_results,
        ))
    }

    /// Assemble an index from explicit parts.
    pub fn new(
        documents_dir: &Path,
        collection: Collection,
        converter: Box<dyn DocumentConverter>,
        chunking: ChunkingConfig,
        n_results: usize,
    ) -> Self {
        Self {
            documents_dir: documents_dir.to_path_buf(),
            collection,
            converter,
            chunking,
            n_results,
        }
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Default number of results for [`search_relevant_chunks`](crate::search::search_relevant_chunks).
    pub fn n_results(&self) -> usize {
        self.n_results
    }

    /// Chunking settings used by [`index_documents`](Self::index_documents)
    /// and [`update_documents`](Self::update_documents).
    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// Index every eligible file in the documents directory.
    pub async fn index_documents(&self) -> Result<IndexReport> {
        self.index_documents_with(&self.chunking).await
    }

    /// [`index_documents`](Self::index_documents) with chunking settings for this run only.
    pub async fn index_documents_with(&self, chunking: &ChunkingConfig) -> Result<IndexReport> {
        chunking.validate()?;
        let files = scan::discover(&self.documents_dir)?;
        info!(
            dir = %self.documents_dir.display(),
            files = files.len(),
            chunk_size = chunking.chunk_size,
            "starting full index"
        );
        Ok(self.process_files(files, chunking).await)
    }

    /// Index only files not yet present in the collection.
    ///
    /// Returns an empty report without touching the store when nothing is new.
    pub async fn update_documents(&self) -> Result<IndexReport> {
        self.update_documents_with(&self.chunking).await
    }

    /// [`update_documents`](Self::update_documents) with chunking settings for this run only.
    pub async fn update_documents_with(&self, chunking: &ChunkingConfig) -> Result<IndexReport> {
        chunking.validate()?;
        let known = self.known_sources().await;
        let files = scan::discover_new(&self.documents_dir, &known)?;
        if files.is_empty() {
            info!("no new documents to index");
            return Ok(IndexReport::default());
        }

        info!(
            known = known.len(),
            new = files.len(),
            "starting incremental update"
        );
        Ok(self.process_files(files, chunking).await)
    }

    /// Sources currently in the collection; a store failure yields an empty set.
    pub async fn known_sources(&self) -> BTreeSet<String> {
        match self.collection.sources().await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "could not list indexed sources, treating as empty");
                BTreeSet::new()
            }
        }
    }

    /// Delete records whose source file is no longer in the documents directory.
    ///
    /// Never run implicitly; returns the number of records deleted.
    pub async fn prune_missing(&self) -> Result<usize> {
        let present: BTreeSet<String> = scan::discover(&self.documents_dir)?
            .into_iter()
            .map(|f| f.name)
            .collect();
        let missing: Vec<String> = self
            .collection
            .sources()
            .await
            .context("Failed to list indexed sources")?
            .into_iter()
            .filter(|s| !present.contains(s))
            .collect();

        if missing.is_empty() {
            info!("no orphaned sources");
            return Ok(0);
        }

        let deleted = self.collection.delete_sources(&missing).await?;
        for source in &missing {
            info!(source = %source, "pruned orphaned source");
        }
        info!(sources = missing.len(), records = deleted, "prune complete");
        Ok(deleted)
    }

    async fn process_files(&self, files: Vec<DiscoveredFile>, chunking: &ChunkingConfig) -> IndexReport {
        let started = Instant::now();
        let files = self.convert_legacy(files).await;

        let mut report = IndexReport::default();
        for file in &files {
            match self.process_file(file, chunking).await {
                Ok(0) => {}
                Ok(added) => {
                    report.files_processed += 1;
                    report.chunks_added += added;
                }
                Err(e) => {
                    error!(file = %file.name, error = %format!("{:#}", e), "failed to index document");
                }
            }
        }

        info!(
            files_processed = report.files_processed,
            chunks_added = report.chunks_added,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "indexing run complete"
        );
        report
    }

    /// Convert every legacy file, replacing its entry with the new `.docx`.
    ///
    /// A failed conversion keeps the legacy entry; extraction then yields no
    /// text and the file is skipped.
    async fn convert_legacy(&self, files: Vec<DiscoveredFile>) -> Vec<DiscoveredFile> {
        let mut out: Vec<DiscoveredFile> = Vec::with_capacity(files.len());
        for file in files {
            let file = if file.format == DocumentFormat::LegacyBinary {
                let new_path = convert_in_place(self.converter.as_ref(), &file.path).await;
                if new_path == file.path {
                    file
                } else {
                    DiscoveredFile {
                        name: new_path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| file.name.clone()),
                        path: new_path,
                        format: DocumentFormat::XmlDocx,
                    }
                }
            } else {
                file
            };

            // report.doc converted next to an existing report.docx
            if !out.iter().any(|f| f.name == file.name) {
                out.push(file);
            }
        }
        out
    }

    /// Extract, chunk and upsert one file. Returns the number of chunks added.
    async fn process_file(&self, file: &DiscoveredFile, chunking: &ChunkingConfig) -> Result<usize> {
        let started = Instant::now();

        let text = extract_or_empty(&file.path, file.format).await;
        if text.trim().is_empty() {
            warn!(file = %file.name, "no text extracted, skipping");
            return Ok(0);
        }

        let chunks = chunk_document(&file.name, &text, chunking);
        let added = self
            .collection
            .upsert_chunks(&chunks)
            .await
            .with_context(|| format!("Failed to store chunks for {}", file.name))?;

        info!(
            file = %file.name,
            chunks = added,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "indexed document"
        );
        Ok(added)
    }
}

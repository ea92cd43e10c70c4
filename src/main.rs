//! # Document RAG Index CLI (`docrag`)
//!
//! Thin command-line front end over the [`doc_rag_index`] library.
//!
//! ## Usage
//!
//! ```bash
//! docrag --config ./config/docrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docrag index [--chunk-size N]` | Index every document in the documents directory |
//! | `docrag update [--chunk-size N]` | Index only documents not yet in the collection |
//! | `docrag search "<query>"` | Retrieve the most relevant passages |
//! | `docrag stats` | Show what is indexed |
//! | `docrag prune` | Delete records of documents that no longer exist |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use doc_rag_index::config::{self, ChunkingConfig, Config};
use doc_rag_index::stats::print_stats;
use doc_rag_index::{DocumentIndex, IndexReport};

/// Document RAG Index: index office documents into a vector collection
/// and retrieve relevant passages.
#[derive(Parser)]
#[command(name = "docrag", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every eligible document in the documents directory.
    ///
    /// Legacy `.doc` files are converted to `.docx` first and the originals
    /// are deleted (disable with `[converter] enabled = false`).
    Index {
        /// Chunk size in characters for this run (defaults to `[chunking] chunk_size`).
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Index only documents whose file name is not yet in the collection.
    Update {
        /// Chunk size in characters for this run (defaults to `[chunking] chunk_size`).
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Search indexed passages.
    Search {
        /// Free-text query.
        query: String,

        /// Maximum number of results (defaults to `[retrieval] n_results`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show record and per-source counts.
    Stats,

    /// Delete records whose source document is no longer present.
    Prune,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_logging(&cfg)?;

    let index = DocumentIndex::open(&cfg).await?;

    match cli.command {
        Commands::Index { chunk_size } => {
            let chunking = chunking_for(&index, chunk_size);
            let report = index.index_documents_with(&chunking).await?;
            print_report("Index", report);
        }
        Commands::Update { chunk_size } => {
            let chunking = chunking_for(&index, chunk_size);
            let report = index.update_documents_with(&chunking).await?;
            print_report("Update", report);
        }
        Commands::Search { query, limit } => {
            let limit = limit.unwrap_or(index.n_results());
            let hits = index.search_relevant_chunks(&query, limit).await;
            if hits.is_empty() {
                println!("No results.");
            }
            for (rank, hit) in hits.iter().enumerate() {
                println!(
                    "{}. [{:.4}] {} #{}",
                    rank + 1,
                    hit.score,
                    hit.source,
                    hit.chunk_index
                );
                println!("   {}", excerpt(&hit.content, 200));
                println!();
            }
        }
        Commands::Stats => {
            let stats = index.stats().await?;
            print_stats(&stats, Some(&cfg.paths.db_path));
        }
        Commands::Prune => {
            let deleted = index.prune_missing().await?;
            println!("Prune complete: {} records deleted", deleted);
        }
    }

    Ok(())
}

fn chunking_for(index: &DocumentIndex, chunk_size: Option<usize>) -> ChunkingConfig {
    let mut chunking = index.chunking().clone();
    if let Some(size) = chunk_size {
        chunking.chunk_size = size;
    }
    chunking
}

/// Install the global subscriber: stderr always, plus `[logging] file` if set.
fn init_logging(cfg: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &cfg.logging.file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

fn print_report(label: &str, report: IndexReport) {
    println!("{} complete", label);
    println!("  files processed: {}", report.files_processed);
    println!("  chunks added: {}", report.chunks_added);
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

//! # Document RAG Index
//!
//! Indexes a directory of office documents (`.doc`, `.docx`, `.pdf`) into a
//! persistent vector collection and retrieves the passages most relevant to
//! a free-text query, for grounding downstream text generation.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌──────────────┐
//! │   Scan    │──▶│  Convert  │──▶│  Extract  │──▶│ Chunk + Embed │
//! │ docs dir  │   │ .doc→docx │   │ docx/pdf  │   │  (batched)    │
//! └───────────┘   └───────────┘   └───────────┘   └──────┬───────┘
//!                                                        ▼
//!                          ┌──────────┐           ┌────────────┐
//!                          │  Search  │◀──────────│ Collection │
//!                          └──────────┘           │  (SQLite)  │
//!                                                 └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docrag --config ./config/docrag.toml index     # full index
//! docrag --config ./config/docrag.toml update    # only new files
//! docrag --config ./config/docrag.toml search "travel policy" --limit 3
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`scan`] | Corpus scanning |
//! | [`convert`] | Legacy `.doc` → `.docx` conversion |
//! | [`extract`] | Plain-text extraction |
//! | [`chunk`] | Sentence-window chunking and chunk identifiers |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store trait, backends and collections |
//! | [`ingest`] | Full and incremental indexing |
//! | [`search`] | Retrieval |
//! | [`stats`] | Index statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod convert;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod scan;
pub mod search;
pub mod stats;
pub mod store;

pub use ingest::DocumentIndex;
pub use models::{IndexReport, SearchHit};

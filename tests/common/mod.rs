//! Shared fixtures: real `.docx` and `.pdf` files, a converter that needs no
//! office suite, and an index over the in-memory store.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use doc_rag_index::config::ChunkingConfig;
use doc_rag_index::convert::{docx_path_for, ConvertError, DocumentConverter};
use doc_rag_index::embedding::{Embedder, HashingEmbedder};
use doc_rag_index::models::COLLECTION_NAME;
use doc_rag_index::store::memory::InMemoryVectorStore;
use doc_rag_index::store::{Collection, VectorStore};
use doc_rag_index::DocumentIndex;

/// A docx whose body holds one `w:p` per entry of `paragraphs`.
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

/// A one-page PDF showing each entry of `lines` on its own text line.
///
/// Builds the body then the xref table with correct byte offsets.
pub fn pdf_with_lines(lines: &[String]) -> Vec<u8> {
    let mut content = String::from("BT /F1 10 Tf 12 TL 40 800 Td\n");
    for line in lines {
        content.push_str(&format!("({}) Tj T*\n", line));
    }
    content.push_str("ET");

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 842] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// About 2500 characters of policy prose, one sentence per line.
///
/// Each sentence ends with a space so that sentence boundaries survive
/// extractors that join text runs without separators.
pub fn policy_lines() -> Vec<String> {
    (1..=30)
        .map(|i| {
            format!(
                "Policy requirement {:02} says every employee must file travel expenses within thirty days. ",
                i
            )
        })
        .collect()
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Treats the legacy file's bytes as UTF-8 text and writes them into a
/// fresh `.docx` next to it.
pub struct FakeConverter;

#[async_trait]
impl DocumentConverter for FakeConverter {
    async fn convert(&self, source: &Path) -> Result<PathBuf, ConvertError> {
        let target = docx_path_for(source)?;
        let text = std::fs::read_to_string(source).map_err(|e| ConvertError::Spawn {
            program: "fake".to_string(),
            source: e,
        })?;
        let lines: Vec<&str> = text.lines().collect();
        std::fs::write(&target, docx_with_paragraphs(&lines)).map_err(|e| {
            ConvertError::Spawn {
                program: "fake".to_string(),
                source: e,
            }
        })?;
        Ok(target)
    }
}

/// An index over `store` using the hashing embedder and default chunking.
pub async fn index_over(
    dir: &Path,
    store: Arc<dyn VectorStore>,
    converter: Box<dyn DocumentConverter>,
) -> DocumentIndex {
    index_with(dir, store, Arc::new(HashingEmbedder::default()), converter).await
}

pub async fn index_with(
    dir: &Path,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    converter: Box<dyn DocumentConverter>,
) -> DocumentIndex {
    let collection = Collection::get_or_create(COLLECTION_NAME, store, embedder, 16)
        .await
        .unwrap();
    DocumentIndex::new(dir, collection, converter, ChunkingConfig::default(), 5)
}

/// Hashes like [`HashingEmbedder`] but fails any batch containing `trigger`.
pub struct TriggeredFailureEmbedder {
    pub trigger: &'static str,
    inner: HashingEmbedder,
}

impl TriggeredFailureEmbedder {
    pub fn new(trigger: &'static str) -> Self {
        Self {
            trigger,
            inner: HashingEmbedder::default(),
        }
    }
}

#[async_trait]
impl Embedder for TriggeredFailureEmbedder {
    fn model_name(&self) -> &str {
        "triggered-failure"
    }
    fn dims(&self) -> usize {
        self.inner.dims()
    }
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains(self.trigger)) {
            anyhow::bail!("embedding service rejected the batch");
        }
        self.inner.embed(texts).await
    }
}

/// An index over a fresh in-memory store.
pub async fn memory_index(dir: &Path) -> DocumentIndex {
    index_over(dir, Arc::new(InMemoryVectorStore::new()), Box::new(FakeConverter)).await
}

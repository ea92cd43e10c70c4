//! Plain-text extraction for office documents (DOCX, PDF).
//!
//! Dispatch is keyed by [`DocumentFormat`]. Legacy `.doc` files are not read
//! directly: the orchestrator converts them to `.docx` first (see
//! [`crate::convert`]), and a file that is still in legacy form yields
//! [`ExtractError::Unconverted`].

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::DocumentFormat;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY_ENTRY: &str = "word/document.xml";

/// Extraction error. Never fatal: the pipeline logs it and skips the file.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("legacy binary document was not converted to docx")]
    Unconverted,
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
    #[error("extraction task failed: {0}")]
    Join(String),
}

/// Extracts plain text from in-memory document bytes.
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractError> {
    match format {
        DocumentFormat::XmlDocx => extract_docx(bytes),
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::LegacyBinary => Err(ExtractError::Unconverted),
    }
}

/// Reads a file and extracts its text off the async executor.
pub async fn extract_file(path: &Path, format: DocumentFormat) -> Result<String, ExtractError> {
    debug!(path = %path.display(), %format, "extracting");
    let bytes = tokio::fs::read(path).await?;
    tokio::task::spawn_blocking(move || extract_text(&bytes, format))
        .await
        .map_err(|e| ExtractError::Join(e.to_string()))?
}

/// Like [`extract_file`], but any failure is logged and reported as empty text.
///
/// Empty text makes the orchestrator skip the file with a warning instead of
/// indexing garbage.
pub async fn extract_or_empty(path: &Path, format: DocumentFormat) -> String {
    match extract_file(path, format).await {
        Ok(text) => text,
        Err(e) => {
            error!(path = %path.display(), %format, error = %e, "text extraction failed");
            String::new()
        }
    }
}

// ============ DOCX ============

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let entry = archive
        .by_name(DOCX_BODY_ENTRY)
        .map_err(|_| ExtractError::Ooxml(format!("{} not found", DOCX_BODY_ENTRY)))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(format!(
            "{} exceeds size limit ({} bytes)",
            DOCX_BODY_ENTRY, MAX_XML_ENTRY_BYTES
        )));
    }

    let paragraphs = docx_paragraphs(&doc_xml)?;
    Ok(paragraphs
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Collect the text of every `w:p` in document order.
///
/// Run-level `w:tab` becomes `\t`, `w:br`/`w:cr` become `\n`. A paragraph
/// nested inside another (text boxes) is emitted as its own paragraph.
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut run_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"r" => run_depth += 1,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(p) = open.pop() {
                        paragraphs.push(p);
                    }
                }
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                let name = e.local_name();
                if run_depth > 0 {
                    if let Some(current) = open.last_mut() {
                        match name.as_ref() {
                            b"tab" => current.push('\t'),
                            b"br" | b"cr" => current.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                if let Some(current) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

// ============ PDF ============

/// Page-by-page text, so one unreadable page contributes nothing without
/// failing the document. If the page tree cannot be parsed at all, or no
/// page yields any text, whole-document extraction is attempted.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let document = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(load_err) => {
            debug!(error = %load_err, "page-level PDF parse failed, trying whole document");
            return pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| ExtractError::Pdf(format!("{}; {}", load_err, e)));
        }
    };

    let text = extract_pdf_pages(&document);
    if !text.trim().is_empty() {
        return Ok(text);
    }

    debug!("no text from individual pages, trying whole document");
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(whole) => Ok(whole),
        Err(e) => {
            debug!(error = %e, "whole-document PDF extraction failed");
            Ok(text)
        }
    }
}

/// Concatenate the text of every page, each followed by a newline.
fn extract_pdf_pages(document: &lopdf::Document) -> String {
    let mut page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let mut out = String::new();
    for page in page_numbers {
        match document.extract_text(&[page]) {
            Ok(text) => {
                out.push_str(&text);
                out.push('\n');
            }
            Err(e) => debug!(page, error = %e, "skipping unreadable PDF page"),
        }
    }
    out
}

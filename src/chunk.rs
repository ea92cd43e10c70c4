//! Sentence-window text chunker.
//!
//! Splits extracted document text into [`Chunk`]s of roughly `chunk_size`
//! characters. Splitting happens on sentence boundaries, and every chunk
//! after the first is seeded with the last few sentences of the text that
//! precedes it, so retrieval keeps context across chunk boundaries.
//!
//! Each chunk receives a content-addressed identifier derived from its
//! source file name and index, so re-indexing the same file overwrites its
//! records in place instead of duplicating them.
//!
//! # Algorithm
//!
//! 1. Split the text after `.`, `!` or `?` followed by whitespace.
//! 2. Accumulate non-empty sentences into the current chunk.
//! 3. A sentence longer than `chunk_size` is hard-wrapped into pieces of at
//!    most `chunk_size` characters, which are processed in its place.
//! 4. Keep a rolling window of the last `overlap_sentences` sentences added.
//! 5. When the next sentence would push the chunk past `chunk_size`, close
//!    the chunk (sentences joined by a single space) and start the next one
//!    from the rolling window plus the new sentence.
//! 6. Flush whatever is left at the end.
//!
//! Lengths are counted in characters, not bytes. The size bound is
//! approximate: a chunk seeded from the window can exceed `chunk_size`.
//!
//! # Example
//!
//! ```rust
//! use doc_rag_index::chunk::chunk_text;
//!
//! let chunks = chunk_text("First sentence. Second sentence.", 1000, 5);
//! assert_eq!(chunks, vec!["First sentence. Second sentence.".to_string()]);
//! ```

use std::borrow::Cow;
use std::collections::VecDeque;

use sha2::{Digest, Sha256};

use crate::config::ChunkingConfig;
use crate::models::Chunk;

/// Derive the stable identifier of chunk `chunk_index` of `source`.
///
/// SHA-256 over `"{source}_{chunk_index}"`, hex encoded. No time or random
/// component, so the value is identical across runs and processes.
pub fn id_for(source: &str, chunk_index: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}_{}", source, chunk_index).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Chunk a document's text and attach source metadata and identifiers.
pub fn chunk_document(source: &str, text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    chunk_text(text, config.chunk_size, config.overlap_sentences)
        .into_iter()
        .enumerate()
        .map(|(i, text)| make_chunk(source, i as i64, text))
        .collect()
}

/// Split text into overlapping, size-bounded passages.
///
/// Returns an empty vector for blank input; every returned chunk is
/// non-empty. Consecutive chunks share at most `overlap_sentences`
/// sentences.
pub fn chunk_text(text: &str, chunk_size: usize, overlap_sentences: usize) -> Vec<String> {
    let mut queue: VecDeque<Cow<'_, str>> =
        split_sentences(text).into_iter().map(Cow::Borrowed).collect();

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;
    let mut window: VecDeque<String> = VecDeque::with_capacity(overlap_sentences);

    while let Some(raw) = queue.pop_front() {
        let sentence = raw.trim();
        if sentence.is_empty() {
            continue;
        }

        let sentence_len = sentence.chars().count();

        if sentence_len > chunk_size {
            for piece in hard_wrap(sentence, chunk_size).into_iter().rev() {
                queue.push_front(Cow::Owned(piece));
            }
            continue;
        }

        if current_len + sentence_len <= chunk_size {
            current.push(sentence.to_string());
            current_len += sentence_len;
        } else {
            chunks.push(current.join(" "));

            current = window.iter().cloned().collect();
            current.push(sentence.to_string());
            current_len = current.iter().map(|s| s.chars().count()).sum();
        }

        if window.len() == overlap_sentences {
            window.pop_front();
        }
        if overlap_sentences > 0 {
            window.push_back(sentence.to_string());
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Split text after `.`, `!` or `?` when followed by whitespace.
///
/// The whitespace run at each boundary is dropped; sentences keep their
/// terminal punctuation. Segments may be empty or whitespace-only.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            sentences.push(&text[start..i]);
            let mut end = i + c.len_utf8();
            while let Some(&(j, w)) = chars.peek() {
                if !w.is_whitespace() {
                    break;
                }
                end = j + w.len_utf8();
                chars.next();
            }
            start = end;
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    sentences.push(&text[start..]);

    sentences
}

/// Wrap an oversized sentence into pieces of at most `width` characters.
///
/// Breaks at the last whitespace inside the window when there is one,
/// otherwise cuts mid-word. Pieces are trimmed and never empty.
fn hard_wrap(sentence: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut pieces = Vec::new();
    let mut remaining = sentence.trim();

    while !remaining.is_empty() {
        let limit = match remaining.char_indices().nth(width) {
            Some((i, _)) => i,
            None => {
                pieces.push(remaining.to_string());
                break;
            }
        };

        let split = if remaining[limit..].starts_with(char::is_whitespace) {
            limit
        } else {
            remaining[..limit]
                .rfind(char::is_whitespace)
                .filter(|&pos| pos > 0)
                .unwrap_or(limit)
        };

        pieces.push(remaining[..split].trim_end().to_string());
        remaining = remaining[split..].trim_start();
    }

    pieces
}

fn make_chunk(source: &str, index: i64, text: String) -> Chunk {
    Chunk {
        id: id_for(source, index),
        source: source.to_string(),
        chunk_index: index,
        text,
    }
}

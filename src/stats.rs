//! Index statistics.
//!
//! A quick summary of what's indexed: total chunk records, distinct
//! sources, and per-source chunk counts. Used by `docrag stats` to confirm
//! that indexing runs are picking up the expected documents.

use anyhow::Result;

use crate::ingest::DocumentIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub collection: String,
    pub records: usize,
    /// `(source, chunk count)`, ordered by source.
    pub sources: Vec<(String, usize)>,
}

impl DocumentIndex {
    pub async fn stats(&self) -> Result<IndexStats> {
        let collection = self.collection();
        Ok(IndexStats {
            collection: collection.name().to_string(),
            records: collection.count().await?,
            sources: collection.source_counts().await?,
        })
    }
}

/// Print `stats` along with the on-disk size of `db_path`, if it exists.
pub fn print_stats(stats: &IndexStats, db_path: Option<&std::path::Path>) {
    println!("Document Index Stats");
    println!("====================");
    println!();
    if let Some(path) = db_path {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        println!("  Database:    {}", path.display());
        println!("  Size:        {}", format_bytes(size));
    }
    println!("  Collection:  {}", stats.collection);
    println!("  Sources:     {}", stats.sources.len());
    println!("  Chunks:      {}", stats.records);

    if !stats.sources.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<48} {:>8}", "SOURCE", "CHUNKS");
        println!("  {}", "-".repeat(57));
        for (source, count) in &stats.sources {
            println!("  {:<48} {:>8}", source, count);
        }
    }

    println!();
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}

//! Corpus scanning.
//!
//! Only the top level of the documents directory is scanned. A file is
//! eligible when its extension names a supported [`DocumentFormat`]
//! (case-insensitive) and its name does not start with the office lock-file
//! prefix `~$`. Results are sorted by file name so runs are reproducible.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::models::{DocumentFormat, LOCK_FILE_PREFIX};

/// An eligible file in the documents directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Bare file name, used as the `source` of every chunk.
    pub name: String,
    pub format: DocumentFormat,
}

/// List every eligible file directly inside `dir`, sorted by name.
pub fn discover(dir: &Path) -> Result<Vec<DiscoveredFile>> {
    if !dir.is_dir() {
        bail!("documents directory does not exist: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(format) = classify(&name) {
            files.push(DiscoveredFile {
                path: entry.into_path(),
                name,
                format,
            });
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Eligible files whose name is not in `known_sources`.
pub fn discover_new(dir: &Path, known_sources: &BTreeSet<String>) -> Result<Vec<DiscoveredFile>> {
    Ok(discover(dir)?
        .into_iter()
        .filter(|f| !known_sources.contains(&f.name))
        .collect())
}

/// Format of an eligible file name, or `None` for lock files and unsupported types.
pub fn classify(name: &str) -> Option<DocumentFormat> {
    if name.starts_with(LOCK_FILE_PREFIX) {
        return None;
    }
    DocumentFormat::from_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn names(files: &[DiscoveredFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.pdf", "a.docx", "c.doc", "notes.txt", "~$a.docx", "image.png"] {
            touch(tmp.path(), name);
        }

        let files = discover(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["a.docx", "b.pdf", "c.doc"]);
        assert_eq!(files[2].format, DocumentFormat::LegacyBinary);
    }

    #[test]
    fn test_discover_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "REPORT.PDF");
        touch(tmp.path(), "Memo.Docx");

        let files = discover(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["Memo.Docx", "REPORT.PDF"]);
    }

    #[test]
    fn test_discover_ignores_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("archive");
        std::fs::create_dir(&nested).unwrap();
        touch(&nested, "old.pdf");
        std::fs::create_dir(tmp.path().join("folder.pdf")).unwrap();
        touch(tmp.path(), "top.pdf");

        let files = discover(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["top.pdf"]);
    }

    #[test]
    fn test_discover_missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(&tmp.path().join("nope")).is_err());
    }

    #[test]
    fn test_discover_new_excludes_known() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.pdf");
        touch(tmp.path(), "b.pdf");

        let known: BTreeSet<String> = ["a.pdf".to_string()].into_iter().collect();
        let files = discover_new(tmp.path(), &known).unwrap();
        assert_eq!(names(&files), vec!["b.pdf"]);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("x.pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(classify("~$x.docx"), None);
        assert_eq!(classify("x.pdf.bak"), None);
        assert_eq!(classify("pdf"), None);
    }
}

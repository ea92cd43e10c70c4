//! Conversion of legacy binary `.doc` files to `.docx`.
//!
//! The conversion itself is delegated to an external office suite running
//! headless. On success the original `.doc` is **deleted**: the converted
//! `.docx` replaces it in the documents directory and is what gets indexed.
//! This is destructive and cannot be undone; set `[converter] enabled =
//! false` to keep legacy files untouched (they are then skipped).

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::ConverterConfig;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("document conversion is disabled")]
    Disabled,
    #[error("failed to launch converter '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("converter timed out after {0:?}")]
    Timeout(Duration),
    #[error("converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("converter reported success but {0} was not produced")]
    MissingOutput(PathBuf),
    #[error("invalid source path: {0}")]
    InvalidPath(PathBuf),
    #[error("failed to stage converter output in {0}: {1}")]
    Staging(PathBuf, std::io::Error),
}

/// Converts a legacy document into the XML-based format.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Produce a `.docx` next to `source` and return its path.
    ///
    /// Must not delete `source`; [`convert_in_place`] does that once the
    /// new file is confirmed to exist.
    async fn convert(&self, source: &Path) -> Result<PathBuf, ConvertError>;
}

/// Create the converter described by the configuration.
pub fn create_converter(config: &ConverterConfig) -> Box<dyn DocumentConverter> {
    if config.enabled {
        Box::new(SofficeConverter::new(config))
    } else {
        Box::new(DisabledConverter)
    }
}

/// Refuses every conversion; legacy files stay as they are.
pub struct DisabledConverter;

#[async_trait]
impl DocumentConverter for DisabledConverter {
    async fn convert(&self, _source: &Path) -> Result<PathBuf, ConvertError> {
        Err(ConvertError::Disabled)
    }
}

/// Headless LibreOffice (`soffice --convert-to docx`).
///
/// Concurrent office instances sharing one user profile are unsafe, so
/// conversions are serialized through an internal lock.
pub struct SofficeConverter {
    program: String,
    timeout: Duration,
    lock: Mutex<()>,
}

impl SofficeConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            program: config.program.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl DocumentConverter for SofficeConverter {
    async fn convert(&self, source: &Path) -> Result<PathBuf, ConvertError> {
        let out_dir = source
            .parent()
            .ok_or_else(|| ConvertError::InvalidPath(source.to_path_buf()))?;
        let target = docx_path_for(source)?;

        let _guard = self.lock.lock().await;

        // Output goes to a fresh directory so a stale name.docx can never
        // pass for the result of this run.
        let staging = tempfile::Builder::new()
            .prefix(".docrag-convert-")
            .tempdir_in(out_dir)
            .map_err(|e| ConvertError::Staging(out_dir.to_path_buf(), e))?;

        let child = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("docx")
            .arg("--outdir")
            .arg(staging.path())
            .arg(source)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ConvertError::Timeout(self.timeout))?
            .map_err(|e| ConvertError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let produced = match target.file_name() {
            Some(name) => staging.path().join(name),
            None => return Err(ConvertError::InvalidPath(target)),
        };
        if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
            return Err(ConvertError::MissingOutput(target));
        }

        tokio::fs::rename(&produced, &target)
            .await
            .map_err(|e| ConvertError::Staging(target.clone(), e))?;
        Ok(target)
    }
}

/// `dir/name.doc` becomes `dir/name.docx`.
pub fn docx_path_for(source: &Path) -> Result<PathBuf, ConvertError> {
    source
        .file_stem()
        .map(|stem| {
            let mut name = stem.to_os_string();
            name.push(".docx");
            source.with_file_name(name)
        })
        .ok_or_else(|| ConvertError::InvalidPath(source.to_path_buf()))
}

/// Convert `path` and delete the original once the converter reports a `.docx`.
///
/// Returns the converted path, or `path` unchanged if conversion failed;
/// the failure is logged and never propagated.
pub async fn convert_in_place(converter: &dyn DocumentConverter, path: &Path) -> PathBuf {
    let name = file_name(path);
    info!(file = %name, "converting legacy document to docx");

    match converter.convert(path).await {
        Ok(new_path) => {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(file = %name, error = %e, "converted, but failed to delete original");
            }
            info!(from = %name, to = %file_name(&new_path), "conversion succeeded");
            new_path
        }
        Err(e) => {
            error!(file = %name, error = %e, "conversion failed");
            path.to_path_buf()
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CopyConverter;

    #[async_trait]
    impl DocumentConverter for CopyConverter {
        async fn convert(&self, source: &Path) -> Result<PathBuf, ConvertError> {
            let target = docx_path_for(source)?;
            tokio::fs::copy(source, &target)
                .await
                .map_err(|e| ConvertError::Spawn {
                    program: "copy".to_string(),
                    source: e,
                })?;
            Ok(target)
        }
    }

    #[test]
    fn test_docx_path_for() {
        let p = docx_path_for(Path::new("/docs/report.doc")).unwrap();
        assert_eq!(p, PathBuf::from("/docs/report.docx"));
        let p = docx_path_for(Path::new("/docs/Old.Report.DOC")).unwrap();
        assert_eq!(p, PathBuf::from("/docs/Old.Report.docx"));
    }

    #[tokio::test]
    async fn test_successful_conversion_deletes_original() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = dir.path().join("memo.doc");
        std::fs::write(&doc, b"legacy").unwrap();

        let new_path = convert_in_place(&CopyConverter, &doc).await;
        assert_eq!(new_path, dir.path().join("memo.docx"));
        assert!(new_path.exists());
        assert!(!doc.exists());
    }

    #[tokio::test]
    async fn test_failed_conversion_keeps_original() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = dir.path().join("memo.doc");
        std::fs::write(&doc, b"legacy").unwrap();

        let path = convert_in_place(&DisabledConverter, &doc).await;
        assert_eq!(path, doc);
        assert!(doc.exists());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = dir.path().join("memo.doc");
        std::fs::write(&doc, b"legacy").unwrap();

        let converter = SofficeConverter::new(&ConverterConfig {
            enabled: true,
            program: "definitely-not-an-office-suite-binary".to_string(),
            timeout_secs: 5,
        });
        let err = converter.convert(&doc).await.unwrap_err();
        assert!(matches!(err, ConvertError::Spawn { .. }));
        assert!(doc.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_converter_keeps_original_and_existing_docx() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = dir.path().join("memo.doc");
        let docx = dir.path().join("memo.docx");
        std::fs::write(&doc, b"legacy").unwrap();
        std::fs::write(&docx, b"older unrelated docx").unwrap();

        // Exits 0 without writing anything.
        let converter = SofficeConverter::new(&ConverterConfig {
            enabled: true,
            program: "true".to_string(),
            timeout_secs: 5,
        });
        let err = converter.convert(&doc).await.unwrap_err();
        assert!(matches!(err, ConvertError::MissingOutput(_)));

        let path = convert_in_place(&converter, &doc).await;
        assert_eq!(path, doc);
        assert!(doc.exists());
        assert_eq!(std::fs::read(&docx).unwrap(), b"older unrelated docx");

        // No staging directories left behind.
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_converter_output_replaces_existing_docx() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = dir.path().join("memo.doc");
        let docx = dir.path().join("memo.docx");
        std::fs::write(&doc, b"legacy").unwrap();
        std::fs::write(&docx, b"older unrelated docx").unwrap();

        // Stands in for soffice: writes <outdir>/<stem>.docx.
        let script = dir.path().join("fake-soffice.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nout=\"$5\"\nname=$(basename \"$6\" .doc)\nprintf converted > \"$out/$name.docx\"\n",
        )
        .unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let converter = SofficeConverter::new(&ConverterConfig {
            enabled: true,
            program: script.to_string_lossy().to_string(),
            timeout_secs: 5,
        });
        let path = convert_in_place(&converter, &doc).await;
        assert_eq!(path, docx);
        assert!(!doc.exists());
        assert_eq!(std::fs::read(&docx).unwrap(), b"converted");
    }
}

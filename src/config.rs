use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Directory scanned for source documents.
    pub documents_dir: PathBuf,
    /// SQLite file backing the vector collection.
    pub db_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap_sentences")]
    pub overlap_sentences: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap_sentences: default_overlap_sentences(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunking.chunk_size must be > 0");
        }
        if self.overlap_sentences == 0 {
            anyhow::bail!("chunking.overlap_sentences must be > 0");
        }
        Ok(())
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap_sentences() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_n_results")]
    pub n_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            n_results: default_n_results(),
        }
    }
}

fn default_n_results() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConverterConfig {
    /// When false, legacy `.doc` files are left untouched and skipped.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_converter_program")]
    pub program: String,
    #[serde(default = "default_converter_timeout")]
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_converter_program(),
            timeout_secs: default_converter_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_converter_program() -> String {
    "soffice".to_string()
}
fn default_converter_timeout() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Optional log file; output is appended in addition to stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Default configuration for a documents directory and a persistence path.
    pub fn for_paths(documents_dir: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            paths: PathsConfig {
                documents_dir: documents_dir.into(),
                db_path: db_path.into(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            converter: ConverterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.retrieval.n_results < 1 {
            anyhow::bail!("retrieval.n_results must be >= 1");
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }

        match self.embedding.provider.as_str() {
            "local" | "hashing" => {}
            "openai" | "ollama" => {
                if self.embedding.model.is_none() {
                    anyhow::bail!(
                        "embedding.model must be specified when provider is '{}'",
                        self.embedding.provider
                    );
                }
                if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                    anyhow::bail!(
                        "embedding.dims must be > 0 when provider is '{}'",
                        self.embedding.provider
                    );
                }
            }
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be local, openai, ollama, or hashing.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [paths]
            documents_dir = "./docs"
            db_path = "./data/vectors.sqlite"
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap_sentences, 5);
        assert_eq!(config.retrieval.n_results, 5);
        assert_eq!(config.embedding.provider, "local");
        assert!(config.converter.enabled);
        assert_eq!(config.converter.program, "soffice");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = Config::for_paths("docs", "db.sqlite");
        config.chunking.chunk_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_remote_provider_requires_model() {
        let mut config = Config::for_paths("docs", "db.sqlite");
        config.embedding.provider = "openai".to_string();
        assert!(config.validate().is_err());
        config.embedding.model = Some("text-embedding-3-small".to_string());
        config.embedding.dims = Some(1536);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = Config::for_paths("docs", "db.sqlite");
        config.embedding.provider = "magic".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config =
            toml::from_str(include_str!("../config/docrag.example.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.paths.documents_dir, PathBuf::from("./documents"));
        assert_eq!(config.embedding.model.as_deref(), Some("all-minilm-l6-v2"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/docrag.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

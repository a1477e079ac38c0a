//! TOML configuration for the indexer.
//!
//! Every field has a default, so the binary runs without a config file; CLI
//! flags are applied on top of whatever [`load_config`] returns and the merged
//! result is checked once with [`Config::validate`].
//!
//! ```toml
//! [store]
//! backend = "qdrant"
//! url = "http://localhost:6333"
//!
//! [embedding]
//! provider = "ollama"
//! model = "nomic-embed-text"
//! dims = 768
//!
//! [indexing]
//! collection = "synapstor"
//! workers = 8
//! extra_ignore = ["*.lock", "fixtures/"]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::encoding::{TextEncoding, DEFAULT_ENCODINGS};
use crate::sniff::BinaryThresholds;

/// Backends understood by [`crate::store::create_store`].
pub const STORE_BACKENDS: &[&str] = &["qdrant", "memory"];

/// Providers understood by [`crate::embedding::create_provider`].
pub const EMBEDDING_PROVIDERS: &[&str] = &["local", "openai", "ollama"];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_store_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_backend() -> String {
    "qdrant".to_string()
}
fn default_store_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Vector field name used when creating a collection, and preferred when
    /// an existing collection carries several named vectors.
    #[serde(default)]
    pub vector_name: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            vector_name: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Below this many eligible files the pipeline runs sequentially.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default = "default_encodings")]
    pub encodings: Vec<TextEncoding>,
    #[serde(default = "default_true")]
    pub skip_hidden: bool,
    /// Extra gitignore-style patterns appended after the built-in defaults
    /// and the project ignore file.
    #[serde(default)]
    pub extra_ignore: Vec<String>,
    #[serde(default = "default_ignore_file_name")]
    pub ignore_file_name: String,
    #[serde(default)]
    pub binary: BinaryThresholds,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            workers: default_workers(),
            parallel_threshold: default_parallel_threshold(),
            max_file_size_bytes: default_max_file_size_bytes(),
            max_content_chars: default_max_content_chars(),
            encodings: default_encodings(),
            skip_hidden: true,
            extra_ignore: Vec::new(),
            ignore_file_name: default_ignore_file_name(),
            binary: BinaryThresholds::default(),
        }
    }
}

fn default_collection() -> String {
    "synapstor".to_string()
}
fn default_workers() -> usize {
    4
}
fn default_parallel_threshold() -> usize {
    20
}
fn default_max_file_size_bytes() -> u64 {
    5 * 1024 * 1024
}
fn default_max_content_chars() -> usize {
    100_000
}
fn default_encodings() -> Vec<TextEncoding> {
    DEFAULT_ENCODINGS.to_vec()
}
fn default_true() -> bool {
    true
}
fn default_ignore_file_name() -> String {
    ".gitignore".to_string()
}

impl Config {
    /// Checks the merged configuration. Called after CLI overrides are
    /// applied, so a bad flag and a bad file value fail the same way.
    pub fn validate(&self) -> Result<()> {
        if !STORE_BACKENDS.contains(&self.store.backend.as_str()) {
            anyhow::bail!(
                "Unknown store backend: '{}'. Must be qdrant or memory.",
                self.store.backend
            );
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be local, openai, or ollama.",
                self.embedding.provider
            );
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }
        if let Some(name) = &self.embedding.vector_name {
            if name.trim().is_empty() {
                anyhow::bail!("embedding.vector_name must not be empty");
            }
        }

        let indexing = &self.indexing;
        if indexing.collection.trim().is_empty() {
            anyhow::bail!("indexing.collection must not be empty");
        }
        if indexing.workers == 0 {
            anyhow::bail!("indexing.workers must be >= 1");
        }
        if indexing.max_content_chars == 0 {
            anyhow::bail!("indexing.max_content_chars must be >= 1");
        }
        if indexing.encodings.is_empty() {
            anyhow::bail!("indexing.encodings must list at least one encoding");
        }
        let ratio = indexing.binary.max_non_text_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            anyhow::bail!("indexing.binary.max_non_text_ratio must be in (0.0, 1.0]");
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
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.store.backend, "qdrant");
        assert_eq!(config.store.url, "http://localhost:6333");
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.indexing.collection, "synapstor");
        assert_eq!(config.indexing.workers, 4);
        assert_eq!(config.indexing.parallel_threshold, 20);
        assert_eq!(config.indexing.max_file_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.indexing.max_content_chars, 100_000);
        assert_eq!(config.indexing.encodings, DEFAULT_ENCODINGS.to_vec());
        assert!(config.indexing.skip_hidden);
        assert_eq!(config.indexing.ignore_file_name, ".gitignore");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.indexing.workers, 4);
        assert_eq!(config.indexing.binary, BinaryThresholds::default());
    }

    #[test]
    fn test_partial_sections() {
        let file = write_config(
            r#"
[store]
backend = "memory"

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 768

[indexing]
workers = 8
encodings = ["utf-8", "cp1252"]
extra_ignore = ["*.lock"]

[indexing.binary]
sample_bytes = 1024
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.dims, Some(768));
        assert_eq!(config.indexing.workers, 8);
        assert_eq!(
            config.indexing.encodings,
            vec![TextEncoding::Utf8, TextEncoding::Cp1252]
        );
        assert_eq!(config.indexing.extra_ignore, vec!["*.lock".to_string()]);
        assert_eq!(config.indexing.binary.sample_bytes, 1024);
        assert_eq!(config.indexing.binary.min_sample_len, 50);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let file = write_config("[indexing]\nworkers = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let file = write_config("[embedding]\nprovider = \"word2vec\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("word2vec"));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let mut config = Config::default();
        config.store.backend = "pinecone".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_encodings() {
        let file = write_config("[indexing]\nencodings = []\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_unknown_encoding() {
        let file = write_config("[indexing]\nencodings = [\"ebcdic\"]\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_ratio_out_of_range() {
        let mut config = Config::default();
        config.indexing.binary.max_non_text_ratio = 0.0;
        assert!(config.validate().is_err());
        config.indexing.binary.max_non_text_ratio = 1.5;
        assert!(config.validate().is_err());
        config.indexing.binary.max_non_text_ratio = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_config(Path::new("/nonexistent/synapstor.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

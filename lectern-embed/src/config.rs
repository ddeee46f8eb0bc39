//! Configuration for embedding providers

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default model, a 384-dimensional sentence-transformers model.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Default dimension of the hashing provider.
pub const DEFAULT_HASH_DIMENSION: usize = 256;

/// Which [`EmbeddingProvider`](crate::EmbeddingProvider) implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Local ONNX model through fastembed.
    #[default]
    Fastembed,
    /// Deterministic feature hashing, no model files.
    Hash,
}

/// Configuration for embedding providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Provider implementation
    pub provider: ProviderKind,
    /// Name of the fastembed model to use
    pub model_name: String,
    /// Directory where downloaded model files are cached
    pub cache_dir: PathBuf,
    /// Vector dimension of the hashing provider (fastembed models fix their own)
    pub dimension: usize,
    /// Maximum number of texts handed to the model at once
    pub batch_size: usize,
    /// Whether to show a progress bar while downloading model files
    pub show_download_progress: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Fastembed,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            cache_dir: PathBuf::from("models"),
            dimension: DEFAULT_HASH_DIMENSION,
            batch_size: 32,
            show_download_progress: false,
        }
    }
}

impl EmbedConfig {
    /// Create a fastembed configuration for a named model
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Create a default configuration caching models under the given path
    pub fn default_with_path<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Create a configuration for the hashing provider
    pub fn hash(dimension: usize) -> Self {
        Self {
            provider: ProviderKind::Hash,
            model_name: "fnv-feature-hash".to_string(),
            dimension,
            ..Self::default()
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set the model cache directory (builder style)
    pub fn with_cache_dir<P: AsRef<Path>>(self, cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..self
        }
    }

    /// Enable or disable the download progress bar (builder style)
    pub fn with_download_progress(self, show_download_progress: bool) -> Self {
        Self {
            show_download_progress,
            ..self
        }
    }

    /// Check the settings that do not depend on model files
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be at least 1"));
        }
        if self.provider == ProviderKind::Hash && self.dimension == 0 {
            return Err(EmbedError::invalid_config(
                "hash provider dimension must be at least 1",
            ));
        }
        if self.provider == ProviderKind::Fastembed && self.model_name.trim().is_empty() {
            return Err(EmbedError::invalid_config("model_name must not be empty"));
        }
        Ok(())
    }
}

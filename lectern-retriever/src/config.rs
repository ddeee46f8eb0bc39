//! TOML configuration for the retriever and its CLI.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration:
//!
//! ```toml
//! index_dir = ".lectern"
//! top_k = 5
//! encode_concurrency = 2
//!
//! [chunking]
//! strategy = "adaptive"
//! target_tokens = 800
//!
//! [encoder]
//! provider = "fastembed"
//! model_name = "all-MiniLM-L6-v2"
//! batch_size = 32
//! ```

use crate::error::{Result, RetrieverError};
use crate::retrieval::chunking_strategy::ChunkingConfig;
use lectern_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_INDEX_DIR: &str = ".lectern";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_ENCODE_CONCURRENCY: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Directory holding the persisted index
    pub index_dir: PathBuf,
    /// Number of results returned when a query does not ask for a count
    pub top_k: usize,
    /// Encoding batches in flight at once during a build
    pub encode_concurrency: usize,
    pub chunking: ChunkingConfig,
    pub encoder: EmbedConfig,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
            top_k: DEFAULT_TOP_K,
            encode_concurrency: DEFAULT_ENCODE_CONCURRENCY,
            chunking: ChunkingConfig::default(),
            encoder: EmbedConfig::default(),
        }
    }
}

impl RetrieverConfig {
    pub fn new(index_dir: PathBuf) -> Self {
        Self {
            index_dir,
            ..Self::default()
        }
    }

    pub fn with_encoder(mut self, encoder: EmbedConfig) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_encode_concurrency(mut self, encode_concurrency: usize) -> Self {
        self.encode_concurrency = encode_concurrency;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| RetrieverError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            RetrieverError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RetrieverError::config("top_k must be at least 1"));
        }
        if self.encode_concurrency == 0 {
            return Err(RetrieverError::config(
                "encode_concurrency must be at least 1",
            ));
        }
        self.encoder
            .validate()
            .map_err(|e| RetrieverError::config(e.to_string()))?;
        self.chunking
            .validate()
            .map_err(|e| RetrieverError::config(e.to_string()))
    }
}

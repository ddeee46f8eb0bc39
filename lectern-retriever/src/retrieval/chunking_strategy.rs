use crate::error::Result;
use lectern_chunk::{
    Adaptive, ChunkStrategy, Passage, PassageBuilder, SentenceWindow, WordWindow, strategy,
};
use serde::{Deserialize, Serialize};

/// Which segmentation policy the `[chunking]` table selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Adaptive,
    Word,
    Sentence,
}

/// Configuration for chunking documents, as read from the `[chunking]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: StrategyKind,
    /// Words per passage for the word window
    pub chunk_size: usize,
    /// Words shared by adjacent word windows
    pub overlap: usize,
    /// Character budget of a sentence window
    pub max_chars: usize,
    /// Sentences carried into the next sentence window
    pub overlap_sentences: usize,
    /// Adaptive target size in approximate tokens
    pub target_tokens: usize,
    /// Prefix of generated passage ids
    pub id_prefix: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Adaptive,
            chunk_size: strategy::DEFAULT_CHUNK_SIZE,
            overlap: strategy::DEFAULT_OVERLAP,
            max_chars: strategy::DEFAULT_MAX_CHARS,
            overlap_sentences: strategy::DEFAULT_OVERLAP_SENTENCES,
            target_tokens: strategy::DEFAULT_TARGET_TOKENS,
            id_prefix: lectern_chunk::DEFAULT_PREFIX.to_string(),
        }
    }
}

impl ChunkingConfig {
    pub fn new(id_prefix: String) -> Self {
        Self {
            id_prefix,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// The chunker strategy these settings describe.
    pub fn to_strategy(&self) -> ChunkStrategy {
        match self.strategy {
            StrategyKind::Word => {
                ChunkStrategy::WordWindow(WordWindow::new(self.chunk_size, self.overlap))
            }
            StrategyKind::Sentence => ChunkStrategy::SentenceWindow(SentenceWindow::new(
                self.max_chars,
                self.overlap_sentences,
            )),
            StrategyKind::Adaptive => ChunkStrategy::Adaptive(Adaptive {
                target_tokens: self.target_tokens,
                overlap: self.overlap,
                overlap_sentences: self.overlap_sentences,
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.to_strategy().validate()?;
        Ok(())
    }
}

/// Strategy for chunking documents - delegates entirely to lectern-chunk
#[derive(Debug, Clone)]
pub struct ChunkingStrategy {
    builder: PassageBuilder,
}

impl ChunkingStrategy {
    /// Create a new chunking strategy, rejecting invalid size relationships
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        let builder = PassageBuilder::new(config.id_prefix.clone(), config.to_strategy())?;
        Ok(Self { builder })
    }

    /// Chunk a document's text using lectern-chunk
    pub fn chunk_content(&self, text: &str) -> Vec<Passage> {
        let passages = self.builder.get_passages(text);

        tracing::debug!(
            "Chunked {} bytes into {} passages (strategy: {})",
            text.len(),
            passages.len(),
            self.builder.strategy().name()
        );

        passages
    }
}

//! Segmentation strategies and their size parameters.
//!
//! A [`ChunkStrategy`] is chosen once per chunking call. The word and sentence
//! windows are concrete policies; [`Adaptive`] inspects the text and delegates
//! to one of them (or returns the text whole when it is already short).

use crate::error::{ChunkError, Result};
use serde::{Deserialize, Serialize};

/// Default word-window size, in words.
pub const DEFAULT_CHUNK_SIZE: usize = 800;
/// Default number of words shared by adjacent word windows.
pub const DEFAULT_OVERLAP: usize = 150;
/// Default character budget of a sentence window.
pub const DEFAULT_MAX_CHARS: usize = 4000;
/// Default number of sentences carried into the next sentence window.
pub const DEFAULT_OVERLAP_SENTENCES: usize = 2;
/// Default adaptive target, in approximate tokens.
pub const DEFAULT_TARGET_TOKENS: usize = 800;

/// Mean sentence length (characters) above which sentence boundaries are
/// considered unreliable and the word window is used instead.
pub const LONG_SENTENCE_THRESHOLD: f64 = 200.0;
/// Empirical token-to-character ratio used to size sentence windows.
pub const CHARS_PER_TOKEN: usize = 5;
/// Texts shorter than `SHORT_TEXT_FACTOR * target_tokens` characters are not split.
pub const SHORT_TEXT_FACTOR: f64 = 1.5;

/// Fixed-size windows over the whitespace-separated words of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordWindow {
    /// Words per window.
    pub chunk_size: usize,
    /// Words shared between window `n` and window `n + 1`.
    pub overlap: usize,
}

impl Default for WordWindow {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl WordWindow {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// The cursor only advances when `overlap < chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkError::invalid_config("chunk_size must be at least 1"));
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkError::invalid_config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Sentences accumulated into passages bounded by a character budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceWindow {
    /// Maximum passage length in characters, unless one sentence alone is longer.
    pub max_chars: usize,
    /// Trailing sentences of a flushed passage that seed the next one.
    pub overlap_sentences: usize,
}

impl Default for SentenceWindow {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap_sentences: DEFAULT_OVERLAP_SENTENCES,
        }
    }
}

impl SentenceWindow {
    pub fn new(max_chars: usize, overlap_sentences: usize) -> Self {
        Self {
            max_chars,
            overlap_sentences,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chars == 0 {
            return Err(ChunkError::invalid_config("max_chars must be at least 1"));
        }
        Ok(())
    }
}

/// Picks a strategy from the length and sentence density of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adaptive {
    /// Target passage size in approximate tokens.
    pub target_tokens: usize,
    /// Word overlap used when the word window is selected.
    pub overlap: usize,
    /// Sentence overlap used when the sentence window is selected.
    pub overlap_sentences: usize,
}

impl Default for Adaptive {
    fn default() -> Self {
        Self {
            target_tokens: DEFAULT_TARGET_TOKENS,
            overlap: DEFAULT_OVERLAP,
            overlap_sentences: DEFAULT_OVERLAP_SENTENCES,
        }
    }
}

impl Adaptive {
    pub fn new(target_tokens: usize) -> Self {
        Self {
            target_tokens,
            ..Self::default()
        }
    }

    /// Word window used for run-on prose.
    pub fn word_window(&self) -> WordWindow {
        WordWindow::new(self.target_tokens, self.overlap)
    }

    /// Sentence window used for regular prose.
    pub fn sentence_window(&self) -> SentenceWindow {
        SentenceWindow::new(
            self.target_tokens.saturating_mul(CHARS_PER_TOKEN),
            self.overlap_sentences,
        )
    }

    /// Character length below which a text is returned whole.
    pub fn short_text_limit(&self) -> f64 {
        self.target_tokens as f64 * SHORT_TEXT_FACTOR
    }

    /// Both delegate strategies are checked so that a bad configuration fails
    /// regardless of which one a particular text would select.
    pub fn validate(&self) -> Result<()> {
        if self.target_tokens == 0 {
            return Err(ChunkError::invalid_config(
                "target_tokens must be at least 1",
            ));
        }
        self.word_window().validate()?;
        self.sentence_window().validate()
    }
}

/// Segmentation policy, selected once per chunking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkStrategy {
    WordWindow(WordWindow),
    SentenceWindow(SentenceWindow),
    Adaptive(Adaptive),
}

impl Default for ChunkStrategy {
    fn default() -> Self {
        Self::Adaptive(Adaptive::default())
    }
}

impl ChunkStrategy {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::WordWindow(window) => window.validate(),
            Self::SentenceWindow(window) => window.validate(),
            Self::Adaptive(adaptive) => adaptive.validate(),
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WordWindow(_) => "word_window",
            Self::SentenceWindow(_) => "sentence_window",
            Self::Adaptive(_) => "adaptive",
        }
    }
}

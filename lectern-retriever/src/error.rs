//! Error types for building, loading and querying an index

use lectern_chunk::ChunkError;
use lectern_embed::EmbedError;

/// Result type for retriever operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Every failure a [`RetrievalStore`](crate::retrieval::retrieval_store::RetrievalStore)
/// or the on-disk index can report.
///
/// A failed `build` persists nothing and serves nothing new; a failed `load`
/// leaves the store in whatever state it was in before.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// Invalid configuration values or an unreadable config file
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Chunking failed: {source}")]
    Chunking {
        #[from]
        source: ChunkError,
    },

    #[error("Encoding failed: {source}")]
    Encoding {
        #[from]
        source: EmbedError,
    },

    /// A vector with zero or non-finite length cannot be normalized
    #[error("Degenerate {subject}: zero or non-finite norm")]
    DegenerateVector { subject: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted files disagree with each other or with their checksums
    #[error("Corrupt index: {message}")]
    CorruptIndex { message: String },

    #[error("Unsupported index format version {found} (supported: {supported})")]
    UnsupportedFormat { found: u64, supported: u32 },

    /// The persisted index was built by an encoder of a different dimension
    #[error(
        "Index was built with {index_model} ({index_dimension} dimensions) but the encoder is {encoder_model} ({encoder_dimension} dimensions)"
    )]
    EncoderMismatch {
        index_model: String,
        index_dimension: usize,
        encoder_model: String,
        encoder_dimension: usize,
    },

    #[error("No index is loaded; build or load one first")]
    NotLoaded,

    #[error("Cannot build an index from zero passages")]
    EmptyCorpus,

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Background task failed: {source}")]
    Task {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl RetrieverError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        Self::CorruptIndex {
            message: message.into(),
        }
    }

    pub fn degenerate<S: Into<String>>(subject: S) -> Self {
        Self::DegenerateVector {
            subject: subject.into(),
        }
    }
}

//! Error types for the embedding system

/// Result type for embedding operations.
///
/// This is a convenience type alias that uses [`EmbedError`] as the error type.
/// Used throughout the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Comprehensive error type for all embedding operations.
///
/// This enum covers all possible error conditions that can occur when working
/// with embedding providers, from configuration errors to runtime failures during
/// embedding generation. Each variant provides specific context about the failure.
///
/// # Error Categories
///
/// - **Input Errors**: A text in the batch cannot be encoded; the whole batch fails
/// - **Configuration Errors**: Invalid provider settings or unknown models
/// - **Initialization Errors**: Failures during model loading or setup
/// - **Runtime Errors**: Problems during actual embedding generation
/// - **IO Errors**: File system access issues
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// A text in the batch is not encodable; no vectors are returned for the batch
    #[error("Input {index} cannot be encoded: {reason}")]
    UnencodableInput { index: usize, reason: String },

    /// Error when provider configuration is invalid
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// Error during model initialization
    #[error("Model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error during embedding generation
    #[error("Embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The model produced vectors of an unexpected length
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// IO errors when preparing the model cache
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl EmbedError {
    /// Create a model initialization error from any error type.
    pub fn model_init<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::ModelInitialization {
            source: source.into(),
        }
    }

    /// Create an embedding generation error from any error type.
    pub fn embedding_gen<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::EmbeddingGeneration {
            source: source.into(),
        }
    }

    /// Create an invalid configuration error with a custom message.
    ///
    /// This is a convenience constructor for configuration validation errors,
    /// such as unknown model names or zero-sized batches.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an error for an input that cannot be encoded.
    pub fn unencodable<S: Into<String>>(index: usize, reason: S) -> Self {
        Self::UnencodableInput {
            index,
            reason: reason.into(),
        }
    }
}

//! # lectern-embed
//!
//! Turns passages and queries into fixed-length `f32` vectors. Providers are
//! async and sit behind the [`EmbeddingProvider`] trait so callers hold an
//! `Arc<dyn EmbeddingProvider>` and never care which model is behind it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lectern_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> lectern_embed::Result<()> {
//! let provider = FastEmbedProvider::create(
//!     EmbedConfig::default_with_path("/tmp/models")
//! ).await?;
//!
//! let texts = vec!["Hello world".to_string(), "How are you?".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! - [`FastEmbedProvider`]: local ONNX sentence-transformer models through
//!   fastembed. Model files are downloaded into the configured cache directory
//!   on first use.
//! - [`HashEmbedProvider`]: deterministic feature hashing with no model files,
//!   for tests and offline use.
//!
//! Use [`create_provider`] to build whichever one an [`EmbedConfig`] selects.
//!
//! ## Contract
//!
//! Output order matches input order, every vector has the provider's
//! dimension, and batching never changes the result. A batch containing an
//! empty, whitespace-only or NUL-bearing text fails as a whole with
//! [`EmbedError::UnencodableInput`].

pub mod config;
pub mod error;
pub mod hash;
pub mod provider;

// Re-export main types for easy access
pub use config::{EmbedConfig, ProviderKind};
pub use error::{EmbedError, Result};
pub use hash::HashEmbedProvider;
pub use provider::{
    EmbeddingProvider, EmbeddingResult, FastEmbedProvider, create_provider, validate_texts,
};

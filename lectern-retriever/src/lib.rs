//! lectern-retriever: embedding retrieval over chunked documents
//!
//! This crate ties the chunker (`lectern-chunk`) and an encoder
//! (`lectern-embed`) to a flat cosine-similarity index that is persisted as a
//! checksummed, manifest-committed directory. It answers "which passages are
//! most similar to this question" for a retrieval-augmented generation
//! pipeline.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: the [`RetrievalStore`](retrieval::retrieval_store::RetrievalStore)
//!   state machine and the `[chunking]` configuration
//! - **[`storage`]**: the vector index, its snapshots and on-disk format
//! - **[`config`]**: TOML configuration shared with the `lectern` CLI
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lectern_retriever::{config::RetrieverConfig, retrieval::retrieval_store::RetrievalStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = RetrievalStore::from_config(RetrieverConfig::default()).await?;
//! store.load().await?;
//! let hits = store.query("how do I renew a passport?", 5).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Text → Chunker → Passages → Encoder (batched) → VectorIndex ─┐
//!                                                              ├→ IndexSnapshot → manifest + data files
//! Query → Encoder → IndexSnapshot::search ← Arc swap ←─────────┘
//! ```

pub mod config;
pub mod error;
pub mod retrieval;
pub mod storage;

pub use error::{Result, RetrieverError};

//! Storage layer for lectern-retriever
//!
//! An index is an immutable [`IndexSnapshot`]: the normalized vectors, the
//! passage metadata joined to them by position, and a description of the
//! encoder that produced the vectors. Snapshots are built in memory, written
//! to disk as one unit by [`persist`], and never mutated afterwards; a rebuild
//! produces a new snapshot.
//!
//! ## Key Components
//!
//! - **VectorIndex**: flat cosine-similarity search over unit vectors
//! - **IndexSnapshot**: vectors plus `IndexEntry` metadata, searchable by query vector
//! - **persist**: manifest-committed on-disk layout with BLAKE3 checksums
//!
//! ## Layout
//!
//! ```text
//! <index_dir>/manifest.json            commit point, replaced by rename
//! <index_dir>/vectors-<digest>.bin     header + f32 payload
//! <index_dir>/passages-<digest>.json   ordered passages
//! ```

use crate::error::{Result, RetrieverError};
use lectern_chunk::Passage;
use lectern_embed::EmbeddingProvider;
use serde::{Deserialize, Serialize};

pub mod persist;
pub mod vector_index;

pub use vector_index::VectorIndex;

/// Which encoder produced the vectors of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderMetadata {
    /// Provider of the embedding model (e.g., "fastembed")
    pub provider: String,
    /// Name of the embedding model (e.g., "all-MiniLM-L6-v2")
    pub model_name: String,
    /// Dimension of the embedding vectors
    pub dimension: usize,
}

impl EncoderMetadata {
    pub fn new(provider: String, model_name: String, dimension: usize) -> Self {
        Self {
            provider,
            model_name,
            dimension,
        }
    }

    /// Describe a live encoder.
    pub fn of(encoder: &dyn EmbeddingProvider) -> Self {
        Self::new(
            encoder.provider_name().to_string(),
            encoder.model_name().to_string(),
            encoder.embedding_dimension(),
        )
    }

    /// Display label such as `fastembed/all-MiniLM-L6-v2`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model_name)
    }
}

/// Metadata for one stored vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Position of the vector in the [`VectorIndex`]
    pub vector_id: usize,
    pub passage: Passage,
}

/// One search hit. Serializes flat as `{score, id, text, source_offset}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub score: f32,
    #[serde(flatten)]
    pub passage: Passage,
}

/// Immutable, searchable index: vectors and their passages, joined by position.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    index: VectorIndex,
    entries: Vec<IndexEntry>,
    encoder: EncoderMetadata,
}

impl IndexSnapshot {
    /// Join `passages` to the vectors of `index` in order.
    pub fn new(index: VectorIndex, passages: Vec<Passage>, encoder: EncoderMetadata) -> Result<Self> {
        if index.len() != passages.len() {
            return Err(RetrieverError::corrupt(format!(
                "{} vectors but {} passages",
                index.len(),
                passages.len()
            )));
        }
        if index.dimension() != encoder.dimension {
            return Err(RetrieverError::DimensionMismatch {
                expected: encoder.dimension,
                actual: index.dimension(),
            });
        }

        let entries = passages
            .into_iter()
            .enumerate()
            .map(|(vector_id, passage)| IndexEntry { vector_id, passage })
            .collect();
        Ok(Self {
            index,
            entries,
            encoder,
        })
    }

    /// The `k` passages closest to `query_vector`, best first.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<QueryResult>> {
        self.index
            .search(query_vector, k)?
            .into_iter()
            .map(|(score, position)| {
                let entry = self.entries.get(position).ok_or_else(|| {
                    RetrieverError::corrupt(format!("no entry for vector {position}"))
                })?;
                Ok(QueryResult {
                    score,
                    passage: entry.passage.clone(),
                })
            })
            .collect()
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn encoder(&self) -> &EncoderMetadata {
        &self.encoder
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}

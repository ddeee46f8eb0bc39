//! lectern-chunk: turns cleaned document text into overlapping passages.
//!
//! See [`chunker`] for the segmentation policies and [`strategy`] for their
//! size parameters.

pub mod chunker;
pub mod error;
pub mod strategy;

// Re-export the main chunking surface for external use
pub use chunker::{DEFAULT_PREFIX, Passage, PassageBuilder, chunk, passage_id, sentence_spans};
pub use error::{ChunkError, Result};
pub use strategy::{Adaptive, ChunkStrategy, SentenceWindow, WordWindow};

//! Build, load and query a persisted passage index.
//!
//! A [`RetrievalStore`] is either `Unloaded` or `Ready`. `build` and `load`
//! move it to `Ready` by constructing a complete [`IndexSnapshot`] off to the
//! side and swapping the active `Arc` only once everything succeeded, so a
//! failure at any step leaves the previous state (and the previous on-disk
//! index) untouched. Queries clone the active `Arc` and search without
//! holding a lock; a query that started before a rebuild keeps answering
//! from the snapshot it cloned.
//!
//! ```rust,no_run
//! use lectern_retriever::config::RetrieverConfig;
//! use lectern_retriever::retrieval::retrieval_store::RetrievalStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = RetrievalStore::from_config(RetrieverConfig::default()).await?;
//! store.ingest_document("Cats purr. Dogs bark. Cars need fuel.").await?;
//!
//! for hit in store.query("automobile", 1).await? {
//!     println!("{:.3} {}", hit.score, hit.passage.text());
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::RetrieverConfig;
use crate::error::{Result, RetrieverError};
use crate::retrieval::chunking_strategy::ChunkingStrategy;
use crate::storage::{EncoderMetadata, IndexSnapshot, QueryResult, VectorIndex, persist};
use futures::{StreamExt, TryStreamExt, stream};
use lectern_chunk::{ChunkStrategy, Passage};
use lectern_embed::{EmbedError, EmbeddingProvider, create_provider};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    Unloaded,
    Ready,
}

/// Snapshot of what a store is serving.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub state: StoreState,
    pub index_dir: PathBuf,
    pub entries: usize,
    pub dimension: Option<usize>,
    /// Encoder that answers queries
    pub encoder: EncoderMetadata,
    /// Encoder recorded in the active index
    pub index_encoder: Option<EncoderMetadata>,
}

pub struct RetrievalStore {
    encoder: Arc<dyn EmbeddingProvider>,
    config: RetrieverConfig,
    active: RwLock<Option<Arc<IndexSnapshot>>>,
    build_lock: Mutex<()>,
}

impl RetrievalStore {
    /// Create an `Unloaded` store around an explicitly provided encoder.
    pub fn new(encoder: Arc<dyn EmbeddingProvider>, config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            encoder,
            config,
            active: RwLock::new(None),
            build_lock: Mutex::new(()),
        })
    }

    /// Create an `Unloaded` store with the encoder described by `config.encoder`.
    pub async fn from_config(config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        let encoder = create_provider(&config.encoder).await?;
        Self::new(encoder, config)
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn encoder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.encoder
    }

    pub async fn state(&self) -> StoreState {
        match *self.active.read().await {
            Some(_) => StoreState::Ready,
            None => StoreState::Unloaded,
        }
    }

    /// The snapshot currently answering queries, if any.
    pub async fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.active.read().await.clone()
    }

    /// Encode `passages`, persist them and make them the active index.
    pub async fn build(&self, passages: Vec<Passage>) -> Result<Arc<IndexSnapshot>> {
        self.build_with_cancel(passages, &CancellationToken::new())
            .await
    }

    /// [`build`](Self::build), abandoned with [`RetrieverError::Cancelled`] if
    /// `cancel` fires before persistence starts.
    pub async fn build_with_cancel(
        &self,
        passages: Vec<Passage>,
        cancel: &CancellationToken,
    ) -> Result<Arc<IndexSnapshot>> {
        if passages.is_empty() {
            return Err(RetrieverError::EmptyCorpus);
        }
        let _guard = self.build_lock.lock().await;

        tracing::info!(
            "Building index from {} passages with {}",
            passages.len(),
            EncoderMetadata::of(self.encoder.as_ref()).label()
        );
        let vectors = self.encode_passages(&passages, cancel).await?;

        let index = VectorIndex::build(self.encoder.embedding_dimension(), &vectors)?;
        let snapshot = Arc::new(IndexSnapshot::new(
            index,
            passages,
            EncoderMetadata::of(self.encoder.as_ref()),
        )?);

        if cancel.is_cancelled() {
            return Err(RetrieverError::Cancelled);
        }
        persist::save(&self.config.index_dir, Arc::clone(&snapshot)).await?;

        *self.active.write().await = Some(Arc::clone(&snapshot));
        tracing::info!("Index ready with {} entries", snapshot.len());
        Ok(snapshot)
    }

    /// Chunk `text` with `strategy` and build the index from the passages.
    pub async fn ingest(
        &self,
        text: &str,
        strategy: &ChunkStrategy,
        prefix: &str,
    ) -> Result<Arc<IndexSnapshot>> {
        let passages = lectern_chunk::chunk(text, strategy, prefix)?;
        self.build(passages).await
    }

    /// Chunk `text` with the configured `[chunking]` settings and build the index.
    pub async fn ingest_document(&self, text: &str) -> Result<Arc<IndexSnapshot>> {
        let passages = ChunkingStrategy::new(&self.config.chunking)?.chunk_content(text);
        self.build(passages).await
    }

    /// Encode passage texts batch by batch, keeping input order.
    async fn encode_passages(
        &self,
        passages: &[Passage],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>> {
        let batch_size = self.config.encoder.batch_size;
        let batches: Vec<Vec<String>> = passages
            .chunks(batch_size)
            .map(|batch| batch.iter().map(|p| p.text().to_string()).collect())
            .collect();
        let total = batches.len();
        let encoder = &self.encoder;

        let encoded: Vec<Vec<Vec<f32>>> = stream::iter(batches.into_iter().enumerate())
            .map(|(number, texts)| async move {
                if cancel.is_cancelled() {
                    return Err(RetrieverError::Cancelled);
                }
                tracing::debug!(
                    "Encoding batch {}/{} ({} passages)",
                    number + 1,
                    total,
                    texts.len()
                );

                let offset = number * batch_size;
                let result = encoder.embed_texts(&texts).await.map_err(|e| match e {
                    EmbedError::UnencodableInput { index, reason } => {
                        RetrieverError::from(EmbedError::UnencodableInput {
                            index: offset + index,
                            reason,
                        })
                    }
                    other => RetrieverError::from(other),
                })?;

                if result.len() != texts.len() {
                    return Err(EmbedError::embedding_gen(format!(
                        "encoder returned {} vectors for {} texts",
                        result.len(),
                        texts.len()
                    ))
                    .into());
                }
                Ok(result.embeddings)
            })
            .buffered(self.config.encode_concurrency)
            .try_collect()
            .await?;

        Ok(encoded.into_iter().flatten().collect())
    }

    /// Read the persisted index and make it the active one.
    ///
    /// On any failure the store keeps its previous state.
    pub async fn load(&self) -> Result<Arc<IndexSnapshot>> {
        let _guard = self.build_lock.lock().await;

        let snapshot = persist::load(&self.config.index_dir).await?;
        let current = EncoderMetadata::of(self.encoder.as_ref());
        let recorded = snapshot.encoder();

        if recorded.dimension != current.dimension {
            return Err(RetrieverError::EncoderMismatch {
                index_model: recorded.label(),
                index_dimension: recorded.dimension,
                encoder_model: current.label(),
                encoder_dimension: current.dimension,
            });
        }
        if recorded.model_name != current.model_name || recorded.provider != current.provider {
            tracing::warn!(
                "Index was built with {} but queries will be encoded with {}",
                recorded.label(),
                current.label()
            );
        }

        let snapshot = Arc::new(snapshot);
        *self.active.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// The `k` passages most similar to `text`, best first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<QueryResult>> {
        let snapshot = self.snapshot().await.ok_or(RetrieverError::NotLoaded)?;
        let vector = self.encoder.embed_text(text).await?;
        let results = snapshot.search(&vector, k)?;

        tracing::debug!("Query returned {} of {} entries", results.len(), snapshot.len());
        Ok(results)
    }

    pub async fn stats(&self) -> StoreStats {
        let snapshot = self.snapshot().await;
        StoreStats {
            state: if snapshot.is_some() {
                StoreState::Ready
            } else {
                StoreState::Unloaded
            },
            index_dir: self.config.index_dir.clone(),
            entries: snapshot.as_ref().map_or(0, |s| s.len()),
            dimension: snapshot.as_ref().map(|s| s.dimension()),
            encoder: EncoderMetadata::of(self.encoder.as_ref()),
            index_encoder: snapshot.map(|s| s.encoder().clone()),
        }
    }
}

//! Integration tests focusing on happy path scenarios for the retrieval system
//!
//! These tests verify that the core functionality works end to end:
//! - Building an index from passages with an injected encoder
//! - Querying by similarity and joining results back to passages
//! - Persisting, reloading and rebuilding an index directory
//! - Chunking a document straight into an index

use anyhow::Result;
use async_trait::async_trait;
use lectern_chunk::{ChunkStrategy, Passage, WordWindow};
use lectern_embed::{EmbedConfig, EmbedError, EmbeddingProvider, EmbeddingResult};
use lectern_retriever::{
    RetrieverError,
    config::RetrieverConfig,
    retrieval::retrieval_store::{RetrievalStore, StoreState},
};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

/// Deterministic encoder: "cat" and "car" are close, "dog" is elsewhere.
struct ToyEncoder {
    vectors: HashMap<&'static str, [f32; 4]>,
}

impl ToyEncoder {
    fn new() -> Arc<Self> {
        let vectors = HashMap::from([
            ("cat", [1.0, 0.2, 0.0, 0.0]),
            ("car", [0.9, 0.0, 0.5, 0.0]),
            ("dog", [0.0, 0.0, 0.0, 1.0]),
            ("automobile", [0.6, 0.0, 0.8, 0.0]),
            ("kitten", [1.0, 0.3, 0.0, 0.1]),
        ]);
        Arc::new(Self { vectors })
    }
}

#[async_trait]
impl EmbeddingProvider for ToyEncoder {
    async fn embed_texts(&self, texts: &[String]) -> lectern_embed::Result<EmbeddingResult> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let vector = self
                .vectors
                .get(text.as_str())
                .ok_or_else(|| EmbedError::unencodable(index, "unknown word"))?;
            embeddings.push(vector.to_vec());
        }
        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        4
    }

    fn provider_name(&self) -> &str {
        "toy"
    }

    fn model_name(&self) -> &str {
        "cat-dog-car"
    }
}

fn passages(words: &[&str]) -> Vec<Passage> {
    let mut offset = 0;
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let passage = Passage::new(format!("doc_{i:06}"), *word, offset..offset + word.len());
            offset += word.len() + 1;
            passage
        })
        .collect()
}

/// The automobile question lands on "car"
#[tokio::test]
async fn test_automobile_finds_car() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = RetrieverConfig::new(temp_dir.path().join("index"));
    let store = RetrievalStore::new(ToyEncoder::new(), config)?;

    store.build(passages(&["cat", "dog", "car"])).await?;

    let results = store.query("automobile", 1).await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].passage.text(), "car");
    assert_eq!(results[0].passage.id(), "doc_000002");
    assert_eq!(results[0].passage.source_offset(), 8..11);
    assert!(results[0].score <= 1.0 && results[0].score > 0.9);

    Ok(())
}

/// Asking for more results than exist returns every entry once
#[tokio::test]
async fn test_top_k_larger_than_index() -> Result<()> {
    let temp_dir = tempdir()?;
    let store = RetrievalStore::new(
        ToyEncoder::new(),
        RetrieverConfig::new(temp_dir.path().to_path_buf()),
    )?;
    store.build(passages(&["cat", "dog", "car"])).await?;

    let results = store.query("kitten", 10).await?;
    let mut ids: Vec<&str> = results.iter().map(|r| r.passage.id()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], "doc_000000");
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

    Ok(())
}

/// A second process (store) reads the index written by the first
#[tokio::test]
async fn test_persist_and_reload_across_stores() -> Result<()> {
    let temp_dir = tempdir()?;
    let index_dir = temp_dir.path().join("index");

    let writer = RetrievalStore::new(ToyEncoder::new(), RetrieverConfig::new(index_dir.clone()))?;
    writer.build(passages(&["cat", "dog", "car"])).await?;
    let before = writer.query("automobile", 3).await?;

    let reader = RetrievalStore::new(ToyEncoder::new(), RetrieverConfig::new(index_dir))?;
    assert!(matches!(
        reader.query("automobile", 3).await,
        Err(RetrieverError::NotLoaded)
    ));
    reader.load().await?;
    assert_eq!(reader.state().await, StoreState::Ready);

    let after = reader.query("automobile", 3).await?;
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.passage, b.passage);
        assert!((a.score - b.score).abs() < 1e-6);
    }

    Ok(())
}

/// Rebuilding replaces the corpus on disk and in memory
#[tokio::test]
async fn test_rebuild_replaces_corpus() -> Result<()> {
    let temp_dir = tempdir()?;
    let index_dir = temp_dir.path().join("index");
    let store = RetrievalStore::new(ToyEncoder::new(), RetrieverConfig::new(index_dir.clone()))?;

    store.build(passages(&["cat", "dog", "car"])).await?;
    store.build(passages(&["dog"])).await?;

    let results = store.query("automobile", 5).await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].passage.text(), "dog");

    let reloaded = RetrievalStore::new(ToyEncoder::new(), RetrieverConfig::new(index_dir))?;
    reloaded.load().await?;
    assert_eq!(reloaded.stats().await.entries, 1);

    Ok(())
}

/// Chunking a document with the hashing encoder needs no model download
#[tokio::test]
async fn test_ingest_document_with_hash_encoder() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = RetrieverConfig::new(temp_dir.path().join("index"))
        .with_encoder(EmbedConfig::hash(128).with_batch_size(2));
    let store = RetrievalStore::from_config(config).await?;

    let text = "Photosynthesis converts light into chemical energy in plants. \
                Volcanoes erupt molten rock from beneath the crust. \
                Chlorophyll absorbs light for photosynthesis in leaves. \
                Lava cools into basalt after volcanoes erupt.";
    let strategy = ChunkStrategy::WordWindow(WordWindow::new(9, 0));
    let snapshot = store.ingest(text, &strategy, "science").await?;
    assert_eq!(snapshot.len(), 4);

    let results = store.query("volcanoes erupt lava", 1).await?;
    assert_eq!(results[0].passage.text(), "after volcanoes erupt.");
    assert!(results[0].passage.id().starts_with("science_"));

    Ok(())
}

/// Test error handling for common misuse
#[tokio::test]
async fn test_error_handling() -> Result<()> {
    let temp_dir = tempdir()?;
    let store = RetrievalStore::new(
        ToyEncoder::new(),
        RetrieverConfig::new(temp_dir.path().join("index")),
    )?;

    assert!(matches!(
        store.build(Vec::new()).await,
        Err(RetrieverError::EmptyCorpus)
    ));
    assert!(matches!(store.load().await, Err(RetrieverError::Io { .. })));
    assert!(matches!(
        store.build(passages(&["cat", "giraffe"])).await,
        Err(RetrieverError::Encoding { .. })
    ));
    assert_eq!(store.state().await, StoreState::Unloaded);

    let bad_config = RetrieverConfig {
        top_k: 0,
        ..RetrieverConfig::default()
    };
    assert!(matches!(
        RetrievalStore::new(ToyEncoder::new(), bad_config),
        Err(RetrieverError::Config { .. })
    ));

    Ok(())
}

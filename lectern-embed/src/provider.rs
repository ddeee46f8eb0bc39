//! Embedding provider implementations

use crate::config::{EmbedConfig, ProviderKind};
use crate::error::{EmbedError, Result};
use crate::hash::HashEmbedProvider;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// Result of embedding generation
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text, in input order
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result from a vector of embeddings.
    ///
    /// The dimension is inferred from the first embedding vector.
    /// If the embeddings vector is empty, dimension defaults to 0.
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text.
///
/// Output order matches input order and every vector has
/// [`embedding_dimension`](Self::embedding_dimension) components. Batching is
/// a performance concern only: embedding `[a, b]` yields the same vectors as
/// embedding `[a]` and `[b]` separately. If any input is unencodable the whole
/// call fails and no vectors are returned.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::embedding_gen("no embedding generated for text"))
    }

    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;

    /// Get the name of the model behind this provider
    fn model_name(&self) -> &str;
}

/// Reject the batch if any text cannot be encoded.
///
/// Empty or whitespace-only texts and texts containing NUL characters are
/// not encodable.
pub fn validate_texts(texts: &[String]) -> Result<()> {
    for (index, text) in texts.iter().enumerate() {
        if text.trim().is_empty() {
            return Err(EmbedError::unencodable(index, "text is empty"));
        }
        if text.contains('\0') {
            return Err(EmbedError::unencodable(index, "text contains a NUL character"));
        }
    }
    Ok(())
}

/// Build the provider selected by `config`.
pub async fn create_provider(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    config.validate()?;
    match config.provider {
        ProviderKind::Fastembed => Ok(Arc::new(FastEmbedProvider::create(config.clone()).await?)),
        ProviderKind::Hash => Ok(Arc::new(HashEmbedProvider::new(config.dimension)?)),
    }
}

/// Map a configured model name onto a built-in fastembed model.
pub fn fastembed_model(model_name: &str) -> Result<EmbeddingModel> {
    let name = model_name
        .strip_prefix("sentence-transformers/")
        .or_else(|| model_name.strip_prefix("BAAI/"))
        .unwrap_or(model_name);

    match name.to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        _ => Err(EmbedError::invalid_config(format!(
            "unsupported fastembed model: {model_name}"
        ))),
    }
}

/// FastEmbed-based embedding provider using real ONNX models
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Downloads (if needed) and loads the model, then probes its dimension.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        config.validate()?;
        let model_kind = fastembed_model(&config.model_name)?;

        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            config.model_name
        );
        tokio::fs::create_dir_all(&config.cache_dir).await?;

        let init_config = config.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                let init_options = InitOptions::new(model_kind)
                    .with_cache_dir(init_config.cache_dir.clone())
                    .with_show_download_progress(init_config.show_download_progress);

                let mut model =
                    TextEmbedding::try_new(init_options).map_err(EmbedError::model_init)?;

                // Get dimension by generating a test embedding
                let probe = model
                    .embed(vec!["validation test".to_string()], None)
                    .map_err(EmbedError::model_init)?;
                let dimension = validate_probe(&probe)?;

                tracing::info!("Model loaded successfully. Dimension: {}", dimension);
                Ok((model, dimension))
            })
            .await??;

        Ok(Self {
            config,
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }
}

/// Checks the probe embedding produced while loading a model.
fn validate_probe(probe: &[Vec<f32>]) -> Result<usize> {
    let embedding = probe
        .first()
        .ok_or_else(|| EmbedError::invalid_config("Model validation failed: no embeddings generated"))?;

    if embedding.is_empty() {
        return Err(EmbedError::invalid_config(
            "Model validation failed: empty embedding",
        ));
    }
    if embedding.iter().any(|value| !value.is_finite()) {
        return Err(EmbedError::invalid_config(
            "Model validation failed: non-finite values in embedding",
        ));
    }
    Ok(embedding.len())
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        validate_texts(texts)?;
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.config.batch_size) {
            let chunk = chunk.to_vec();
            let model = Arc::clone(&self.model);

            let batch_embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut model_guard = model
                    .lock()
                    .map_err(|_| EmbedError::embedding_gen("embedding model lock poisoned"))?;
                model_guard
                    .embed(chunk, None)
                    .map_err(EmbedError::embedding_gen)
            })
            .await??;

            for embedding in &batch_embeddings {
                if embedding.len() != self.dimension {
                    return Err(EmbedError::DimensionMismatch {
                        expected: self.dimension,
                        actual: embedding.len(),
                    });
                }
            }
            all_embeddings.extend(batch_embeddings);
        }

        if all_embeddings.len() != texts.len() {
            return Err(EmbedError::embedding_gen(format!(
                "model returned {} embeddings for {} texts",
                all_embeddings.len(),
                texts.len()
            )));
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_result() {
        let embeddings = vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]];
        let result = EmbeddingResult::new(embeddings);

        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 3);
        assert!(!result.is_empty());
        assert_eq!(EmbeddingResult::new(vec![]).dimension, 0);
    }

    #[test]
    fn test_validate_texts() {
        let good = vec!["hello".to_string(), "  world ".to_string()];
        assert!(validate_texts(&good).is_ok());
        assert!(validate_texts(&[]).is_ok());

        let blank = vec!["fine".to_string(), "   ".to_string()];
        match validate_texts(&blank) {
            Err(EmbedError::UnencodableInput { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected unencodable input, got {other:?}"),
        }

        let nul = vec!["bad\0text".to_string()];
        assert!(matches!(
            validate_texts(&nul),
            Err(EmbedError::UnencodableInput { index: 0, .. })
        ));
    }

    #[test]
    fn test_fastembed_model_names() {
        assert!(matches!(
            fastembed_model("all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            fastembed_model("sentence-transformers/all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            fastembed_model("BAAI/bge-small-en-v1.5"),
            Ok(EmbeddingModel::BGESmallENV15)
        ));
        assert!(matches!(
            fastembed_model("no-such-model"),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_probe() {
        assert_eq!(validate_probe(&[vec![0.5, 0.5]]).unwrap(), 2);
        assert!(validate_probe(&[]).is_err());
        assert!(validate_probe(&[vec![]]).is_err());
        assert!(validate_probe(&[vec![f32::NAN]]).is_err());
    }

    #[tokio::test]
    async fn test_create_provider_hash() {
        let provider = create_provider(&EmbedConfig::hash(32)).await.unwrap();
        assert_eq!(provider.provider_name(), "hash");
        assert_eq!(provider.embedding_dimension(), 32);

        let vector = provider.embed_text("retrieval").await.unwrap();
        assert_eq!(vector.len(), 32);
    }

    #[tokio::test]
    #[ignore] // Integration test: downloads all-MiniLM-L6-v2 - run with: cargo test test_fastembed_embedding -- --ignored
    async fn test_fastembed_embedding() -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok(); // Ignore if already initialized

        let cache_dir = tempfile::tempdir()?;
        let config = EmbedConfig::default_with_path(cache_dir.path()).with_batch_size(2);
        let provider = FastEmbedProvider::create(config).await?;

        assert_eq!(provider.provider_name(), "fastembed");
        assert_eq!(provider.embedding_dimension(), 384);

        let texts = vec![
            "Neural networks learn representations.".to_string(),
            "Support vector machines are margin-based classifiers.".to_string(),
            "Gradient descent minimises a loss function.".to_string(),
        ];
        let batch = provider.embed_texts(&texts).await?;
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.dimension, 384);

        // Batching must not change the vectors.
        let single = provider.embed_text(&texts[2]).await?;
        for (a, b) in single.iter().zip(&batch.embeddings[2]) {
            assert!((a - b).abs() < 1e-4);
        }

        assert!(matches!(
            provider.embed_texts(&["ok".to_string(), String::new()]).await,
            Err(EmbedError::UnencodableInput { index: 1, .. })
        ));
        Ok(())
    }
}

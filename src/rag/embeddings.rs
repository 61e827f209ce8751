//! Dense embedding generation.
//!
//! The embedding model is expensive to load, so it is created once per
//! process: an [`EmbeddingService`] owns a lazily-initialized singleton
//! behind `OnceCell` and every caller goes through an injected handle. There
//! is no ambient global.
//!
//! Output vectors are mean-pooled by the model and L2-normalized here, so
//! cosine similarity downstream reduces to a dot product. Embedding failures
//! surface as [`AppError::Embedding`]; callers must never substitute a zero
//! vector.

use async_trait::async_trait;

use crate::types::Result;

/// Capability interface for anything that can turn text into a vector.
///
/// The ingestion worker and the retriever both depend on this trait, which
/// keeps the model-backed service out of unit tests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text. Deterministic: the same text yields the same vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Output dimensionality.
    fn dimensions(&self) -> usize;

    /// Identifier of the underlying model, used for cache keys.
    fn model_name(&self) -> &str;
}

/// Normalize a vector to unit length in place. Zero vectors stay zero.
pub fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}

// ============================================================================
// fastembed-backed service
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use fastembed_impl::{EmbeddingModelType, EmbeddingService};

#[cfg(feature = "local-embeddings")]
mod fastembed_impl {
    use std::str::FromStr;
    use std::sync::Arc;

    use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
    use tokio::sync::OnceCell;

    use super::{l2_normalize, Embedder};
    use crate::rag::cache::LruEmbeddingCache;
    use crate::types::{AppError, Result};

    /// Supported embedding models.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum EmbeddingModelType {
        /// BGE Small EN v1.5 - fast, good quality (default)
        #[default]
        BgeSmallEnV15,
        /// BGE Base EN v1.5 - higher quality, slower
        BgeBaseEnV15,
        /// All-MiniLM-L6-v2 - lightweight
        AllMiniLmL6V2,
    }

    impl EmbeddingModelType {
        fn to_fastembed_model(self) -> FastEmbedModel {
            match self {
                Self::BgeSmallEnV15 => FastEmbedModel::BGESmallENV15,
                Self::BgeBaseEnV15 => FastEmbedModel::BGEBaseENV15,
                Self::AllMiniLmL6V2 => FastEmbedModel::AllMiniLML6V2,
            }
        }

        pub fn dimensions(self) -> usize {
            match self {
                Self::BgeSmallEnV15 | Self::AllMiniLmL6V2 => 384,
                Self::BgeBaseEnV15 => 768,
            }
        }

        pub fn name(self) -> &'static str {
            match self {
                Self::BgeSmallEnV15 => "BAAI/bge-small-en-v1.5",
                Self::BgeBaseEnV15 => "BAAI/bge-base-en-v1.5",
                Self::AllMiniLmL6V2 => "sentence-transformers/all-MiniLM-L6-v2",
            }
        }
    }

    impl FromStr for EmbeddingModelType {
        type Err = AppError;

        fn from_str(s: &str) -> Result<Self> {
            match s {
                "BAAI/bge-small-en-v1.5" | "bge-small" => Ok(Self::BgeSmallEnV15),
                "BAAI/bge-base-en-v1.5" | "bge-base" => Ok(Self::BgeBaseEnV15),
                "sentence-transformers/all-MiniLM-L6-v2" | "minilm" => Ok(Self::AllMiniLmL6V2),
                _ => Err(AppError::Configuration(format!(
                    "Unknown embedding model: {}. Use: bge-small, bge-base, minilm",
                    s
                ))),
            }
        }
    }

    /// Embedding service wrapping a fastembed text-embedding model.
    ///
    /// The model is loaded on first use and shared for the lifetime of the
    /// process; a cold start takes seconds, inference takes milliseconds.
    pub struct EmbeddingService {
        model_type: EmbeddingModelType,
        cache: Option<Arc<LruEmbeddingCache>>,
        model: OnceCell<Arc<tokio::sync::Mutex<TextEmbedding>>>,
    }

    impl EmbeddingService {
        pub fn new(model_type: EmbeddingModelType) -> Self {
            Self {
                model_type,
                cache: None,
                model: OnceCell::new(),
            }
        }

        /// Attach a vector cache, checked before every inference.
        pub fn with_cache(mut self, cache: Arc<LruEmbeddingCache>) -> Self {
            self.cache = Some(cache);
            self
        }

        async fn get_model(&self) -> Result<Arc<tokio::sync::Mutex<TextEmbedding>>> {
            self.model
                .get_or_try_init(|| async {
                    let model_type = self.model_type;
                    tokio::task::spawn_blocking(move || {
                        let init_options = InitOptions::new(model_type.to_fastembed_model())
                            .with_show_download_progress(false);
                        let model = TextEmbedding::try_new(init_options).map_err(|e| {
                            AppError::Embedding(format!("Failed to load embedding model: {}", e))
                        })?;
                        Ok(Arc::new(tokio::sync::Mutex::new(model)))
                    })
                    .await
                    .map_err(|e| AppError::Embedding(format!("Model load task failed: {}", e)))?
                })
                .await
                .map(Arc::clone)
        }
    }

    #[async_trait::async_trait]
    impl Embedder for EmbeddingService {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if let Some(cache) = &self.cache {
                let key = cache.compute_key(text, self.model_type.name());
                if let Some(values) = cache.get(&key) {
                    return Ok(values);
                }
            }

            let model = self.get_model().await?;
            let owned = text.to_string();
            let mut vectors = tokio::task::spawn_blocking(move || {
                let mut model = model.blocking_lock();
                model.embed(vec![owned], None)
            })
            .await
            .map_err(|e| AppError::Embedding(format!("Embedding task failed: {}", e)))?
            .map_err(|e| AppError::Embedding(format!("Inference failed: {}", e)))?;

            let mut values = vectors
                .pop()
                .ok_or_else(|| AppError::Embedding("Model returned no vector".to_string()))?;
            l2_normalize(&mut values);

            if let Some(cache) = &self.cache {
                let key = cache.compute_key(text, self.model_type.name());
                cache.set(&key, values.clone());
            }

            Ok(values)
        }

        fn dimensions(&self) -> usize {
            self.model_type.dimensions()
        }

        fn model_name(&self) -> &str {
            self.model_type.name()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Retrieval pipeline components.
//!
//! - [`embeddings`] - dense embedding service with a process-wide cached model
//! - [`cache`] - LRU cache for computed embedding vectors
//! - [`retriever`] - user-scoped similarity search with the relevance gate
//! - [`assembler`] - query-time context chunking, scoring and packing
//!
//! Ingestion-side chunking lives in [`crate::ingest`]; the assembler here is
//! the overlap-aware, query-time one.

pub mod assembler;
pub mod cache;
pub mod embeddings;
pub mod retriever;

pub use assembler::{AssembledContext, AssemblerConfig, ContextAssembler};
pub use cache::{CacheConfig, CacheStats, LruEmbeddingCache};
pub use embeddings::Embedder;
#[cfg(feature = "local-embeddings")]
pub use embeddings::{EmbeddingModelType, EmbeddingService};
pub use retriever::{RetrievedContext, Retriever, RetrieverConfig};

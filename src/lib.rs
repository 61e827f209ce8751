//! # Mnema - personal memory pipeline
//!
//! Mnema turns heterogeneous user content (free text plus embedded URLs) into
//! searchable vector embeddings, and answers natural-language queries by
//! retrieving the most relevant stored fragments, feeding them to a language
//! model, and attaching provenance back onto the conversation record.
//!
//! ## Overview
//!
//! Two flows share this crate:
//!
//! 1. **Ingestion** - a queue consumer extracts links and text, chunks,
//!    deduplicates by deterministic id, embeds, and upserts into the vector
//!    store. Jobs arrive at-least-once; deterministic chunk ids make
//!    reprocessing idempotent.
//! 2. **Query** - the question is embedded, similar chunks are retrieved and
//!    gated for relevance, context is re-chunked and packed, the model
//!    answers, and the exchange is persisted with best-effort attribution.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use mnema::ingest::{enqueue_ingest, IngestionWorker, WorkerConfig};
//! use mnema::queue::{run_consumer, InMemoryJobQueue, EMBEDDING_QUEUE};
//! use mnema::types::IngestJob;
//!
//! let worker = IngestionWorker::new(contents, vectors, embedder, extractor,
//!     WorkerConfig::default());
//! enqueue_ingest(queue.as_ref(), &IngestJob {
//!     content_id: "c1".into(),
//!     user_id: "u1".into(),
//! }).await?;
//! run_consumer(queue, EMBEDDING_QUEUE, std::sync::Arc::new(worker)).await?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `local-embeddings` | fastembed ONNX embedding models (default) |
//!
//! ## Modules
//!
//! - [`ingest`] - job consumers, chunking, deterministic ids
//! - [`extract`] - URL scanning and per-domain content extraction
//! - [`rag`] - embeddings, retrieval gate, context assembly
//! - [`chat`] - prompt templating, answer generation, provenance
//! - [`queue`] - job queue abstraction and consumer loop
//! - [`db`] - vector store and chat/content store interfaces
//! - [`types`] - common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Query answering: prompts, generation, provenance.
pub mod chat;
/// Storage collaborator interfaces (vector store, content/chat stores).
pub mod db;
/// URL scanning and content extraction.
pub mod extract;
/// Ingestion workers, chunking, deterministic chunk ids.
pub mod ingest;
/// LLM provider clients and abstractions.
pub mod llm;
/// Job queue abstraction and consumer loop.
pub mod queue;
/// Embeddings, retrieval, and context assembly.
pub mod rag;
/// Core types (records, jobs, messages, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use chat::{AnswerGenerator, AskRequest, PromptKind, PromptTemplater, Tone};
pub use db::{ChatStore, ContentStore, VectorStore};
pub use extract::{ExtractorKind, LinkExtractor};
pub use ingest::{DeletionWorker, IngestionWorker, TextChunker};
pub use llm::{LlmClient, Provider};
pub use queue::{JobOutcome, JobQueue};
pub use rag::{ContextAssembler, Embedder, Retriever};
pub use types::{Answer, AppError, Result};
pub use utils::config::Config;

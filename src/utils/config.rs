use serde::Deserialize;
use std::env;

use crate::types::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub queue: QueueConfig,
    pub vector: VectorConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub extract: ExtractConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub broker_url: String,
    pub embedding_queue: String,
    pub delete_queue: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorConfig {
    pub top_k: usize,
    pub relevance_threshold: f32,
    pub upsert_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub ollama_url: String,
    pub model: String,
    pub max_context_tokens: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Per-request timeout for extraction HTTP calls, in seconds.
    pub timeout_secs: u64,
    /// Endpoint of the third-party content-resolution service used for
    /// twitter/linkedin links.
    pub resolver_url: String,
    pub resolver_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    pub chunk_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            queue: QueueConfig {
                broker_url: env::var("BROKER_URL")
                    .unwrap_or_else(|_| "amqp://localhost:5672".to_string()),
                embedding_queue: env::var("EMBEDDING_QUEUE")
                    .unwrap_or_else(|_| "embedding_jobs".to_string()),
                delete_queue: env::var("DELETE_QUEUE")
                    .unwrap_or_else(|_| "delete_jobs".to_string()),
            },
            vector: VectorConfig {
                top_k: parse_var("VECTOR_TOP_K", 5)?,
                relevance_threshold: parse_var("RELEVANCE_THRESHOLD", 0.5)?,
                upsert_batch_size: parse_var("UPSERT_BATCH_SIZE", 50)?,
            },
            embedding: EmbeddingConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "BAAI/bge-small-en-v1.5".to_string()),
            },
            llm: LlmConfig {
                ollama_url: env::var("OLLAMA_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
                max_context_tokens: parse_var("MAX_CONTEXT_TOKENS", 2000)?,
            },
            extract: ExtractConfig {
                timeout_secs: parse_var("EXTRACT_TIMEOUT_SECS", 30)?,
                resolver_url: env::var("RESOLVER_URL").unwrap_or_default(),
                resolver_api_key: env::var("RESOLVER_API_KEY").ok(),
            },
            ingest: IngestConfig {
                chunk_size: parse_var("CHUNK_SIZE", 1000)?,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Configuration(format!("{} has invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

//! Ingestion worker - the `embedding_jobs` consumer.
//!
//! Per message: parse, validate, process, settle.
//!
//! - Malformed JSON is a poison message: discarded, never requeued.
//! - Missing `user_id`/`content_id`: acknowledged without processing, logged.
//! - Content not found: acknowledged without processing.
//! - Invalid-input errors during processing are non-retryable (discard);
//!   every other error is retryable (requeue, unbounded, no backoff).
//!
//! Within a job, links are extracted sequentially and chunk existence is
//! checked against the vector store *before* any embedding is computed, so a
//! redelivered or re-sent job embeds nothing it already stored. Upserts go
//! out in batches to bound request payload size; the staging buffer is
//! cleared after every flush.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::db::store::ContentStore;
use crate::db::vectorstore::VectorStore;
use crate::extract::{scan_text, ContentExtractor};
use crate::ingest::chunker::TextChunker;
use crate::ingest::id::chunk_id;
use crate::queue::{Delivery, JobHandler, JobOutcome};
use crate::rag::embeddings::Embedder;
use crate::types::{AppError, Content, IngestJob, Result, VectorMetadata, VectorRecord};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Ingestion chunk size, in characters.
    pub chunk_size: usize,
    /// Records per upsert request.
    pub upsert_batch_size: usize,
    /// Stored snippet length for link-derived chunks.
    pub snippet_length: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            upsert_batch_size: 50,
            snippet_length: 200,
        }
    }
}

/// Counters for one processed job.
#[derive(Debug, Clone, Copy, Default)]
struct IngestStats {
    embedded: usize,
    deduped: usize,
    links_extracted: usize,
}

// ============================================================================
// Ingestion Worker
// ============================================================================

pub struct IngestionWorker {
    contents: Arc<dyn ContentStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn ContentExtractor>,
    chunker: TextChunker,
    config: WorkerConfig,
}

impl IngestionWorker {
    pub fn new(
        contents: Arc<dyn ContentStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn ContentExtractor>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            contents,
            vectors,
            embedder,
            extractor,
            chunker: TextChunker::new(config.chunk_size),
            config,
        }
    }

    async fn process(&self, job: &IngestJob, content: &Content) -> Result<IngestStats> {
        let scanned = scan_text(&content.text);
        let mut staging: Vec<VectorRecord> = Vec::new();
        let mut stats = IngestStats::default();

        if !scanned.clean_text.is_empty() {
            let source_key = scanned.clean_text.clone();
            self.stage_source(
                &mut staging,
                &mut stats,
                job,
                &source_key,
                "generic",
                None,
                &scanned.clean_text,
            )
            .await?;
        }

        let extracted = self.extractor.extract_all(&scanned.links).await;
        stats.links_extracted = extracted.len();
        for (link, text) in &extracted {
            self.stage_source(
                &mut staging,
                &mut stats,
                job,
                &link.url,
                link.kind.tag(),
                Some(link.url.clone()),
                text,
            )
            .await?;
        }

        if !staging.is_empty() {
            self.vectors.upsert(&staging).await?;
            staging.clear();
        }

        Ok(stats)
    }

    /// Chunk one source, skip chunks the store already has, embed the rest
    /// and stage them, flushing full batches along the way.
    #[allow(clippy::too_many_arguments)]
    async fn stage_source(
        &self,
        staging: &mut Vec<VectorRecord>,
        stats: &mut IngestStats,
        job: &IngestJob,
        source_key: &str,
        tag: &str,
        url: Option<String>,
        text: &str,
    ) -> Result<()> {
        let chunks = self.chunker.chunk(text);
        let ids: Vec<String> = (0..chunks.len())
            .map(|index| chunk_id(source_key, index))
            .collect();

        // Existence probe before any embedding is computed.
        let existing: HashSet<String> = self
            .vectors
            .fetch_by_ids(&ids)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();

        for (index, chunk) in chunks.iter().enumerate() {
            let id = &ids[index];
            if existing.contains(id) {
                debug!(id, chunk_index = index, tag, "chunk already stored, skipping");
                stats.deduped += 1;
                continue;
            }

            let values = self.embedder.embed(chunk).await?;
            let (content_field, snippet) = if url.is_some() {
                (
                    None,
                    Some(chunk.chars().take(self.config.snippet_length).collect()),
                )
            } else {
                (Some(chunk.clone()), None)
            };

            staging.push(VectorRecord {
                id: id.clone(),
                values,
                metadata: VectorMetadata {
                    content: content_field,
                    content_snippet: snippet,
                    tag: tag.to_string(),
                    chunk_index: index,
                    url: url.clone(),
                    user_id: job.user_id.clone(),
                    content_id: job.content_id.clone(),
                    created_at: Utc::now(),
                },
            });
            stats.embedded += 1;

            if staging.len() >= self.config.upsert_batch_size {
                self.vectors.upsert(staging).await?;
                staging.clear();
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl JobHandler for IngestionWorker {
    async fn handle(&self, delivery: &Delivery) -> JobOutcome {
        let job: IngestJob = match serde_json::from_slice(&delivery.payload) {
            Ok(job) => job,
            Err(e) => {
                error!(error = %e, "malformed job payload, discarding poison message");
                return JobOutcome::Discard;
            }
        };

        if job.content_id.is_empty() || job.user_id.is_empty() {
            warn!(
                content_id = %job.content_id,
                user_id = %job.user_id,
                "job missing required fields, dropping"
            );
            return JobOutcome::Ack;
        }

        let content = match self.contents.get_content(&job.content_id, &job.user_id).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                warn!(content_id = %job.content_id, "content not found, dropping job");
                return JobOutcome::Ack;
            }
            Err(e) => {
                warn!(content_id = %job.content_id, error = %e, "content lookup failed, requeueing");
                return JobOutcome::Retry;
            }
        };

        match self.process(&job, &content).await {
            Ok(stats) => {
                info!(
                    content_id = %job.content_id,
                    embedded = stats.embedded,
                    deduped = stats.deduped,
                    links = stats.links_extracted,
                    redelivered = delivery.redelivered,
                    "job processed"
                );
                JobOutcome::Ack
            }
            Err(AppError::InvalidInput(e)) => {
                error!(content_id = %job.content_id, error = %e, "non-retryable error, discarding");
                JobOutcome::Discard
            }
            Err(e) => {
                warn!(content_id = %job.content_id, error = %e, "processing failed, requeueing");
                JobOutcome::Retry
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

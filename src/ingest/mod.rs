//! Ingestion pipeline: job consumption, chunking, deduplication, embedding,
//! and vector upserts.
//!
//! - [`chunker`] - fixed-size ingestion chunker (no overlap)
//! - [`id`] - deterministic chunk ids, the deduplication mechanism
//! - [`worker`] - the `embedding_jobs` consumer
//! - [`deleter`] - the `delete_jobs` consumer

pub mod chunker;
pub mod deleter;
pub mod id;
pub mod worker;

pub use chunker::{TextChunker, DEFAULT_CHUNK_SIZE};
pub use deleter::DeletionWorker;
pub use id::chunk_id;
pub use worker::{IngestionWorker, WorkerConfig};

use crate::queue::{JobQueue, DELETE_QUEUE, EMBEDDING_QUEUE};
use crate::types::{AppError, DeleteJob, IngestJob, Result};

/// Producer-side helper: enqueue an ingestion job.
pub async fn enqueue_ingest(queue: &dyn JobQueue, job: &IngestJob) -> Result<()> {
    let payload =
        serde_json::to_vec(job).map_err(|e| AppError::Queue(format!("Bad job payload: {}", e)))?;
    queue.send(EMBEDDING_QUEUE, &payload).await
}

/// Producer-side helper: enqueue a deletion job.
pub async fn enqueue_delete(queue: &dyn JobQueue, job: &DeleteJob) -> Result<()> {
    let payload =
        serde_json::to_vec(job).map_err(|e| AppError::Queue(format!("Bad job payload: {}", e)))?;
    queue.send(DELETE_QUEUE, &payload).await
}

//! Deletion worker - the `delete_jobs` consumer.
//!
//! Removes every vector tied to a deleted content id. Unlike ingestion,
//! deletion retries are bounded: up to three attempts with a fixed delay,
//! then the job dead-ends (discarded, no requeue). The queue's 24h TTL and
//! length cap stop dead deletions from accumulating either way.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::db::vectorstore::VectorStore;
use crate::queue::{Delivery, JobHandler, JobOutcome};
use crate::types::DeleteJob;

pub struct DeletionWorker {
    vectors: Arc<dyn VectorStore>,
    max_attempts: usize,
    retry_delay: Duration,
}

impl DeletionWorker {
    pub fn new(vectors: Arc<dyn VectorStore>) -> Self {
        Self {
            vectors,
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Override the fixed delay between attempts.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

#[async_trait::async_trait]
impl JobHandler for DeletionWorker {
    async fn handle(&self, delivery: &Delivery) -> JobOutcome {
        let job: DeleteJob = match serde_json::from_slice(&delivery.payload) {
            Ok(job) => job,
            Err(e) => {
                error!(error = %e, "malformed delete payload, discarding poison message");
                return JobOutcome::Discard;
            }
        };

        if job.content_id.is_empty() || job.user_id.is_empty() {
            warn!(
                content_id = %job.content_id,
                user_id = %job.user_id,
                "delete job missing required fields, dropping"
            );
            return JobOutcome::Ack;
        }

        for attempt in 1..=self.max_attempts {
            match self
                .vectors
                .delete_by_content(&job.content_id, &job.user_id)
                .await
            {
                Ok(removed) => {
                    info!(content_id = %job.content_id, removed, "vectors deleted");
                    return JobOutcome::Ack;
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        content_id = %job.content_id,
                        attempt,
                        error = %e,
                        "delete failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    error!(
                        content_id = %job.content_id,
                        attempts = self.max_attempts,
                        error = %e,
                        "delete attempts exhausted, dead-ending job"
                    );
                }
            }
        }

        JobOutcome::Discard
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Job Queue Abstraction
//!
//! Durable producer/consumer transport for ingestion and deletion work. The
//! broker product itself is an external collaborator; the pipeline only
//! depends on the [`JobQueue`] trait. Messages are delivered at-least-once
//! and consumers must tolerate redelivery (chunk ids are deterministic, so
//! reprocessing is idempotent).
//!
//! Retry policy is a first-class decision, not a side effect: a handler
//! returns a [`JobOutcome`] and the consumer loop drives acknowledgement
//! from it.
//!
//! ```text
//! received → parsed → validated → processed → Ack
//!                                           → Retry   (nack + requeue)
//!                                           → Discard (nack, no requeue)
//! ```

pub mod memory;

pub use memory::InMemoryJobQueue;

use crate::types::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Queue carrying ingestion jobs. Durable, unbounded.
pub const EMBEDDING_QUEUE: &str = "embedding_jobs";

/// Queue carrying deletion jobs. Durable, message TTL 24h, max length 10,000.
pub const DELETE_QUEUE: &str = "delete_jobs";

// ============================================================================
// Queue Policy
// ============================================================================

/// Declaration-time properties of a queue.
#[derive(Debug, Clone, Default)]
pub struct QueuePolicy {
    pub durable: bool,
    pub message_ttl: Option<Duration>,
    pub max_length: Option<usize>,
}

impl QueuePolicy {
    pub fn durable() -> Self {
        Self {
            durable: true,
            ..Default::default()
        }
    }

    pub fn with_message_ttl(mut self, ttl: Duration) -> Self {
        self.message_ttl = Some(ttl);
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// Policy for [`EMBEDDING_QUEUE`].
pub fn embedding_queue_policy() -> QueuePolicy {
    QueuePolicy::durable()
}

/// Policy for [`DELETE_QUEUE`].
pub fn delete_queue_policy() -> QueuePolicy {
    QueuePolicy::durable()
        .with_message_ttl(Duration::from_secs(24 * 60 * 60))
        .with_max_length(10_000)
}

// ============================================================================
// Delivery & Outcome
// ============================================================================

/// A single in-flight message. Acknowledge it exactly once through
/// [`JobQueue::ack`] or [`JobQueue::nack`].
#[derive(Debug)]
pub struct Delivery {
    pub(crate) tag: u64,
    pub(crate) queue: String,
    pub payload: Vec<u8>,
    /// True when this message has been delivered before.
    pub redelivered: bool,
}

/// What the consumer loop should do with a processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Done (successfully, or dropped on purpose) - remove from the queue.
    Ack,
    /// Transient failure - requeue for redelivery.
    Retry,
    /// Poison or dead-ended message - remove without reprocessing.
    Discard,
}

/// Per-message processing logic, one implementation per queue.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, delivery: &Delivery) -> JobOutcome;
}

// ============================================================================
// Job Queue Trait
// ============================================================================

/// Abstract trait for the message broker.
///
/// `receive` hands out one message at a time; the consumer loop below never
/// requests the next message before settling the current one, which is the
/// prefetch-limit-of-1 behavior that caps peak memory in the worker.
///
/// Implementations over a real broker own the connection: they are expected
/// to install error/close handlers and reconnect with exponential backoff
/// internally, surfacing `AppError::Queue` only when the transport is gone
/// for good.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Declare a queue with the given policy. Idempotent.
    async fn declare(&self, queue: &str, policy: QueuePolicy) -> Result<()>;

    /// Publish a payload to a queue.
    async fn send(&self, queue: &str, payload: &[u8]) -> Result<()>;

    /// Wait for and take the next message. Returns `None` when the queue has
    /// been closed and drained.
    async fn receive(&self, queue: &str) -> Result<Option<Delivery>>;

    /// Settle a message as done.
    async fn ack(&self, delivery: Delivery) -> Result<()>;

    /// Reject a message, optionally putting it back for redelivery.
    async fn nack(&self, delivery: Delivery, requeue: bool) -> Result<()>;

    /// Close the queue for consumption; pending `receive` calls drain what is
    /// left and then observe `None`.
    async fn close(&self, queue: &str) -> Result<()>;
}

// ============================================================================
// Consumer Loop
// ============================================================================

/// Drive a handler over a queue until the queue is closed.
///
/// One message at a time: the next `receive` happens only after the current
/// delivery was acked or nacked according to the handler's [`JobOutcome`].
pub async fn run_consumer(
    queue: Arc<dyn JobQueue>,
    queue_name: &str,
    handler: Arc<dyn JobHandler>,
) -> Result<()> {
    info!(queue = queue_name, "consumer started");

    while let Some(delivery) = queue.receive(queue_name).await? {
        let outcome = handler.handle(&delivery).await;
        match outcome {
            JobOutcome::Ack => queue.ack(delivery).await?,
            JobOutcome::Retry => queue.nack(delivery, true).await?,
            JobOutcome::Discard => {
                error!(queue = queue_name, "discarding message");
                queue.nack(delivery, false).await?
            }
        }
    }

    info!(queue = queue_name, "consumer stopped");
    Ok(())
}

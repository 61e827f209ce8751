//! In-memory job queue.
//!
//! At-least-once, FIFO, single-consumer-per-queue transport used by the test
//! suite and local development. Semantics mirror what the pipeline expects
//! from the real broker: durable declaration is a no-op, `max_length` drops
//! from the head, message TTL expires lazily on receive, and a nack with
//! requeue puts the message back at the front flagged as redelivered.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::types::{AppError, Result};

use super::{Delivery, JobQueue, QueuePolicy};

struct PendingMessage {
    tag: u64,
    payload: Vec<u8>,
    redelivered: bool,
    enqueued_at: Instant,
}

struct QueueState {
    policy: QueuePolicy,
    pending: VecDeque<PendingMessage>,
    closed: bool,
    notify: Arc<Notify>,
}

impl QueueState {
    fn expire(&mut self) {
        if let Some(ttl) = self.policy.message_ttl {
            let now = Instant::now();
            self.pending
                .retain(|message| now.duration_since(message.enqueued_at) < ttl);
        }
    }
}

/// See module docs.
#[derive(Default)]
pub struct InMemoryJobQueue {
    queues: Mutex<HashMap<String, QueueState>>,
    next_tag: AtomicU64,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently waiting in `queue`.
    pub fn depth(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .get(queue)
            .map(|state| state.pending.len())
            .unwrap_or(0)
    }

    fn tag(&self) -> u64 {
        self.next_tag.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn declare(&self, queue: &str, policy: QueuePolicy) -> Result<()> {
        let mut queues = self.queues.lock();
        queues.entry(queue.to_string()).or_insert_with(|| QueueState {
            policy,
            pending: VecDeque::new(),
            closed: false,
            notify: Arc::new(Notify::new()),
        });
        Ok(())
    }

    async fn send(&self, queue: &str, payload: &[u8]) -> Result<()> {
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| AppError::Queue(format!("Queue '{}' not declared", queue)))?;
        if state.closed {
            return Err(AppError::Queue(format!("Queue '{}' is closed", queue)));
        }

        if let Some(max_length) = state.policy.max_length {
            while state.pending.len() >= max_length {
                state.pending.pop_front();
            }
        }

        state.pending.push_back(PendingMessage {
            tag: self.tag(),
            payload: payload.to_vec(),
            redelivered: false,
            enqueued_at: Instant::now(),
        });
        state.notify.notify_one();
        Ok(())
    }

    async fn receive(&self, queue: &str) -> Result<Option<Delivery>> {
        loop {
            let notify = {
                let mut queues = self.queues.lock();
                let state = queues
                    .get_mut(queue)
                    .ok_or_else(|| AppError::Queue(format!("Queue '{}' not declared", queue)))?;
                state.expire();

                if let Some(message) = state.pending.pop_front() {
                    return Ok(Some(Delivery {
                        tag: message.tag,
                        queue: queue.to_string(),
                        payload: message.payload,
                        redelivered: message.redelivered,
                    }));
                }
                if state.closed {
                    return Ok(None);
                }
                Arc::clone(&state.notify)
            };

            notify.notified().await;
        }
    }

    async fn ack(&self, _delivery: Delivery) -> Result<()> {
        Ok(())
    }

    async fn nack(&self, delivery: Delivery, requeue: bool) -> Result<()> {
        if !requeue {
            return Ok(());
        }

        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(&delivery.queue)
            .ok_or_else(|| AppError::Queue(format!("Queue '{}' not declared", delivery.queue)))?;
        state.pending.push_front(PendingMessage {
            tag: delivery.tag,
            payload: delivery.payload,
            redelivered: true,
            enqueued_at: Instant::now(),
        });
        state.notify.notify_one();
        Ok(())
    }

    async fn close(&self, queue: &str) -> Result<()> {
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| AppError::Queue(format!("Queue '{}' not declared", queue)))?;
        state.closed = true;
        state.notify.notify_one();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

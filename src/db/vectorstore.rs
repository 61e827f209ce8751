//! Vector Store Abstraction Layer
//!
//! Unified interface over the vector database used for chunk embeddings.
//! The pipeline needs four operations: upsert, existence fetch by id (the
//! deduplication probe), user-scoped similarity query, and deletion of all
//! vectors for a content id.
//!
//! # Example
//!
//! ```rust,ignore
//! use mnema::db::vectorstore::{InMemoryVectorStore, QueryFilter, VectorStore};
//!
//! let store = InMemoryVectorStore::new();
//! store.upsert(&records).await?;
//!
//! let matches = store
//!     .query(&query_embedding, 5, &QueryFilter::for_user("u1"))
//!     .await?;
//! ```

use crate::types::{Result, VectorMatch, VectorRecord};
use async_trait::async_trait;

// ============================================================================
// Query Filter
// ============================================================================

/// Metadata filter applied to similarity queries.
///
/// Retrieval is always scoped to a single user; cross-user retrieval is
/// intentionally impossible through this interface.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    pub user_id: String,
}

impl QueryFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Abstract trait for vector database operations.
///
/// Implementations wrap whatever vector product backs the deployment; the
/// in-memory implementation below backs the test suite.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert embedding records. Records are identified by their
    /// deterministic `id`; an existing id is overwritten, never duplicated.
    ///
    /// Returns the number of records written.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Fetch the records that exist among `ids`.
    ///
    /// Missing ids are simply absent from the result; this is the
    /// fetch-before-embed deduplication probe, so it must be cheap and must
    /// not error on unknown ids.
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<VectorRecord>>;

    /// Similarity search: top `top_k` matches for `vector`, restricted by
    /// `filter`, sorted by score descending.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &QueryFilter,
    ) -> Result<Vec<VectorMatch>>;

    /// Delete every vector whose metadata ties it to `content_id` for the
    /// given user. Returns the number of records removed.
    async fn delete_by_content(&self, content_id: &str, user_id: &str) -> Result<usize>;
}

// ============================================================================
// In-Memory Vector Store (for testing)
// ============================================================================

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory vector store.
///
/// Data is not persisted and is lost when the process exits. Uses cosine
/// similarity; since the embedding service L2-normalizes its output, this is
/// a dot product over unit vectors.
pub struct InMemoryVectorStore {
    records: Arc<RwLock<HashMap<String, VectorRecord>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Total number of stored records, across all users.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut store = self.records.write();
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<VectorRecord>> {
        let store = self.records.read();
        Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &QueryFilter,
    ) -> Result<Vec<VectorMatch>> {
        let store = self.records.read();

        let mut matches: Vec<VectorMatch> = store
            .values()
            .filter(|record| record.metadata.user_id == filter.user_id)
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: Self::cosine_similarity(vector, &record.values),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn delete_by_content(&self, content_id: &str, user_id: &str) -> Result<usize> {
        let mut store = self.records.write();
        let before = store.len();
        store.retain(|_, record| {
            !(record.metadata.content_id == content_id && record.metadata.user_id == user_id)
        });
        Ok(before - store.len())
    }
}

// ============================================================================
// Tests
// ============================================================================

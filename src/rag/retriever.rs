//! Similarity retrieval with the relevance gate.
//!
//! A query vector goes to the vector store scoped to one user; the top
//! matches come back with their stored text. Whether that context is
//! trustworthy enough to *cite* is a separate decision: the validity gate
//! requires the best match to clear a similarity threshold and the combined
//! context to be long enough to mean anything. A failed gate is not an error,
//! it just suppresses provenance - the answer can still use whatever context
//! exists.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::db::vectorstore::{QueryFilter, VectorStore};
use crate::types::{ContextStats, Result, VectorMatch};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Number of matches requested from the vector store.
    pub top_k: usize,
    /// Minimum similarity score of the best match for the gate to pass.
    pub min_score: f32,
    /// Number of top matches concatenated into the context.
    pub context_matches: usize,
    /// Hard cap on the concatenated context, in characters.
    pub max_context_chars: usize,
    /// Minimum context length for the gate to pass.
    pub min_context_chars: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.5,
            context_matches: 3,
            max_context_chars: 4000,
            min_context_chars: 50,
        }
    }
}

// ============================================================================
// Retrieved Context
// ============================================================================

/// Outcome of a retrieval, gate already applied.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// All matches, best first.
    pub matches: Vec<VectorMatch>,
    /// Concatenated text of the top matches, capped.
    pub context: String,
    /// Content id of the best match when the gate passed, empty otherwise.
    pub content_id: String,
    /// Distinct content ids among all matches.
    pub source_count: usize,
    pub stats: ContextStats,
}

impl RetrievedContext {
    /// Whether the relevance gate passed.
    pub fn gate_passed(&self) -> bool {
        !self.content_id.is_empty()
    }
}

// ============================================================================
// Retriever
// ============================================================================

pub struct Retriever {
    store: Arc<dyn VectorStore>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, config: RetrieverConfig) -> Self {
        Self { store, config }
    }

    /// Top-K similarity search for `user_id`, with gating.
    pub async fn retrieve(&self, query_vector: &[f32], user_id: &str) -> Result<RetrievedContext> {
        let matches = self
            .store
            .query(query_vector, self.config.top_k, &QueryFilter::for_user(user_id))
            .await?;

        let top_score = matches.first().map(|m| m.score).unwrap_or(0.0);
        let context = self.build_context(&matches);
        let context_chars = context.chars().count();

        let source_count = matches
            .iter()
            .map(|m| m.metadata.content_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let gate_passed =
            top_score >= self.config.min_score && context_chars >= self.config.min_context_chars;
        let content_id = if gate_passed {
            matches[0].metadata.content_id.clone()
        } else {
            String::new()
        };

        debug!(
            user_id,
            matches = matches.len(),
            top_score,
            context_chars,
            gate_passed,
            "retrieval complete"
        );

        Ok(RetrievedContext {
            stats: ContextStats {
                match_count: matches.len(),
                top_score,
                context_chars,
            },
            matches,
            context,
            content_id,
            source_count,
        })
    }

    fn build_context(&self, matches: &[VectorMatch]) -> String {
        let joined = matches
            .iter()
            .take(self.config.context_matches)
            .map(|m| m.metadata.text())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        if joined.chars().count() > self.config.max_context_chars {
            joined.chars().take(self.config.max_context_chars).collect()
        } else {
            joined
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::vectorstore::InMemoryVectorStore;
    use crate::types::{VectorMetadata, VectorRecord};
    use chrono::Utc;

    fn record(id: &str, values: Vec<f32>, text: &str, content_id: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            metadata: VectorMetadata {
                content: Some(text.to_string()),
                content_snippet: None,
                tag: "generic".into(),
                chunk_index: 0,
                url: None,
                user_id: "u1".into(),
                content_id: content_id.to_string(),
                created_at: Utc::now(),
            },
        }
    }

    async fn retriever_with(records: Vec<VectorRecord>) -> Retriever {
        let store = Arc::new(InMemoryVectorStore::new());
        store.upsert(&records).await.unwrap();
        Retriever::new(store, RetrieverConfig::default())
    }

    #[tokio::test]
    async fn test_gate_passes_on_strong_match() {
        let text = "Rust's ownership system guarantees memory safety without a garbage \
                    collector, enforced entirely at compile time.";
        let retriever = retriever_with(vec![record("a", vec![1.0, 0.0], text, "c1")]).await;

        let retrieved = retriever.retrieve(&[1.0, 0.0], "u1").await.unwrap();
        assert!(retrieved.gate_passed());
        assert_eq!(retrieved.content_id, "c1");
        assert_eq!(retrieved.stats.match_count, 1);
        assert!(retrieved.stats.top_score > 0.99);
    }

    #[tokio::test]
    async fn test_gate_fails_on_weak_score() {
        let text = "A long enough body of text that clearly clears the fifty character \
                    minimum for the context side of the gate.";
        // Nearly orthogonal to the query vector: score well under 0.5.
        let retriever = retriever_with(vec![record("a", vec![0.1, 0.99], text, "c1")]).await;

        let retrieved = retriever.retrieve(&[1.0, 0.0], "u1").await.unwrap();
        assert!(!retrieved.gate_passed());
        assert_eq!(retrieved.content_id, "");
        assert!(!retrieved.context.is_empty());
    }

    #[tokio::test]
    async fn test_gate_fails_on_short_context() {
        let retriever = retriever_with(vec![record("a", vec![1.0, 0.0], "too short", "c1")]).await;

        let retrieved = retriever.retrieve(&[1.0, 0.0], "u1").await.unwrap();
        assert!(retrieved.stats.top_score >= 0.5);
        assert!(!retrieved.gate_passed());
        assert_eq!(retrieved.content_id, "");
    }

    #[tokio::test]
    async fn test_empty_store() {
        let retriever = retriever_with(vec![]).await;
        let retrieved = retriever.retrieve(&[1.0, 0.0], "u1").await.unwrap();
        assert_eq!(retrieved.stats.match_count, 0);
        assert_eq!(retrieved.content_id, "");
        assert_eq!(retrieved.context, "");
    }

    #[tokio::test]
    async fn test_context_uses_top_three_matches() {
        let filler = "x".repeat(60);
        let retriever = retriever_with(vec![
            record("a", vec![1.0, 0.0], &format!("first {}", filler), "c1"),
            record("b", vec![0.95, 0.05], &format!("second {}", filler), "c1"),
            record("c", vec![0.9, 0.1], &format!("third {}", filler), "c2"),
            record("d", vec![0.85, 0.15], &format!("fourth {}", filler), "c3"),
        ])
        .await;

        let retrieved = retriever.retrieve(&[1.0, 0.0], "u1").await.unwrap();
        assert_eq!(retrieved.stats.match_count, 4);
        assert!(retrieved.context.contains("first"));
        assert!(retrieved.context.contains("third"));
        assert!(!retrieved.context.contains("fourth"));
        assert_eq!(retrieved.source_count, 3);
    }

    #[tokio::test]
    async fn test_context_is_capped() {
        let huge = "word ".repeat(2000);
        let retriever = retriever_with(vec![
            record("a", vec![1.0, 0.0], &huge, "c1"),
            record("b", vec![0.9, 0.1], &huge, "c1"),
        ])
        .await;

        let retrieved = retriever.retrieve(&[1.0, 0.0], "u1").await.unwrap();
        assert_eq!(retrieved.context.chars().count(), 4000);
        assert!(retrieved.gate_passed());
    }
}

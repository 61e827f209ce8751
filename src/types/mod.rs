use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============= Content Types =============

/// A piece of user-submitted content, as stored by the relational layer.
///
/// Creation and edits are handled by the CRUD layer (out of scope here);
/// the pipeline only reads contents and reacts to ingestion/deletion jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only projection of a Content record used for attribution.
///
/// Never stored independently; derived on demand by the content store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub content_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

// ============= Chat Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single message within a chat. Messages are append-only; ordering is
/// insertion order.
///
/// The provenance fields (`content_id`, `source_info`, `attribution`,
/// `context_stats`) are attached only when the retrieval gate passes;
/// otherwise they stay empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub role: MessageRole,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_info: Option<SourceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_stats: Option<ContextStats>,
    pub created_at: DateTime<Utc>,
}

/// Summary numbers describing the retrieved context behind an answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextStats {
    /// Number of vector matches returned by the similarity search.
    pub match_count: usize,
    /// Similarity score of the best match.
    pub top_score: f32,
    /// Length in characters of the assembled context.
    pub context_chars: usize,
}

/// The answer object handed back to the chat/UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer: String,
    /// Empty string when the retrieval gate failed.
    pub content_id: String,
    pub chat_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_info: Option<SourceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    pub context_stats: ContextStats,
    /// Whether a new chat was implicitly created for this exchange.
    pub created_chat: bool,
}

// ============= Job Types =============

/// Queue payload asking the worker to (re-)ingest a content record.
///
/// Delivered at-least-once; processing must tolerate redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestJob {
    pub content_id: String,
    pub user_id: String,
}

/// Queue payload asking the worker to remove all vectors for a content id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteJob {
    pub content_id: String,
    pub user_id: String,
}

// ============= Vector Types =============

/// Metadata carried alongside every stored embedding.
///
/// Text chunks carry the full window in `content`; link-derived chunks carry
/// a bounded `content_snippet` plus the originating `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    pub tag: String,
    pub chunk_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub user_id: String,
    pub content_id: String,
    pub created_at: DateTime<Utc>,
}

impl VectorMetadata {
    /// The stored text of this chunk, whichever field carries it.
    pub fn text(&self) -> &str {
        self.content
            .as_deref()
            .or(self.content_snippet.as_deref())
            .unwrap_or("")
    }
}

/// A single embedding record as upserted into the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Deterministic hash of (source key, chunk index).
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// A scored match returned from a similarity query.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM rate limited: {0}")]
    LlmRateLimited(String),

    #[error("LLM authentication failed: {0}")]
    LlmAuth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_payload_round_trip() {
        let job = IngestJob {
            content_id: "c1".into(),
            user_id: "u1".into(),
        };
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"contentId\":\"c1\""));
        assert!(json.contains("\"userId\":\"u1\""));
        assert_eq!(serde_json::from_str::<IngestJob>(&json).unwrap(), job);
    }

    #[test]
    fn test_metadata_text_prefers_content() {
        let meta = VectorMetadata {
            content: Some("full window".into()),
            content_snippet: Some("snippet".into()),
            tag: "generic".into(),
            chunk_index: 0,
            url: None,
            user_id: "u1".into(),
            content_id: "c1".into(),
            created_at: Utc::now(),
        };
        assert_eq!(meta.text(), "full window");
    }

    #[test]
    fn test_metadata_text_falls_back_to_snippet() {
        let meta = VectorMetadata {
            content: None,
            content_snippet: Some("snippet".into()),
            tag: "medium".into(),
            chunk_index: 3,
            url: Some("https://medium.com/x".into()),
            user_id: "u1".into(),
            content_id: "c1".into(),
            created_at: Utc::now(),
        };
        assert_eq!(meta.text(), "snippet");
    }

    #[test]
    fn test_vector_metadata_wire_format() {
        let meta = VectorMetadata {
            content: None,
            content_snippet: Some("s".into()),
            tag: "medium".into(),
            chunk_index: 2,
            url: Some("https://medium.com/x".into()),
            user_id: "u1".into(),
            content_id: "c1".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"chunkIndex\":2"));
        assert!(json.contains("\"contentSnippet\":\"s\""));
        assert!(!json.contains("\"content\":"));
    }
}

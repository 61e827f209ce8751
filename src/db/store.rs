//! Content and chat storage collaborator interfaces.
//!
//! The relational/document schema and its CRUD belong to another layer; the
//! pipeline consumes these traits only. `InMemoryStore` implements both for
//! the test suite and for local development.

use crate::types::{
    AppError, ChatMessage, Content, ContextStats, Result, SourceInfo,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Read access to user content records and their attribution projections.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a content record owned by `user_id`. `None` when the record
    /// does not exist or belongs to someone else.
    async fn get_content(&self, content_id: &str, user_id: &str) -> Result<Option<Content>>;

    /// Derive the attribution projection for a content record.
    async fn get_source_info(&self, content_id: &str, user_id: &str)
        -> Result<Option<SourceInfo>>;

    /// A short preview of the content body, at most `max_length` characters.
    async fn get_content_preview(
        &self,
        content_id: &str,
        user_id: &str,
        max_length: usize,
    ) -> Result<Option<String>>;
}

/// Provenance fields patched onto an assistant message after the fact.
#[derive(Debug, Clone)]
pub struct ProvenancePatch {
    pub content_id: String,
    pub source_info: SourceInfo,
    pub attribution: String,
    pub context_stats: ContextStats,
}

/// Append-only chat persistence.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create a new chat for `user_id` and return its id.
    async fn create_chat(&self, user_id: &str) -> Result<String>;

    async fn chat_exists(&self, chat_id: &str) -> Result<bool>;

    /// Append a message; messages are never reordered or rewritten, with the
    /// sole exception of the provenance patch below.
    async fn append_message(&self, message: &ChatMessage) -> Result<()>;

    /// Attach provenance to an already-persisted assistant message.
    async fn patch_message_provenance(
        &self,
        chat_id: &str,
        message_id: &str,
        patch: &ProvenancePatch,
    ) -> Result<()>;

    /// Bump the chat's last-active timestamp.
    async fn touch_chat(&self, chat_id: &str) -> Result<()>;
}

// ============================================================================
// In-Memory Store (tests, local development)
// ============================================================================

#[derive(Debug, Clone)]
struct ChatRow {
    #[allow(dead_code)]
    user_id: String,
    last_active: DateTime<Utc>,
    messages: Vec<ChatMessage>,
}

/// In-memory implementation of both storage traits.
#[derive(Default)]
pub struct InMemoryStore {
    contents: Arc<RwLock<HashMap<String, Content>>>,
    chats: Arc<RwLock<HashMap<String, ChatRow>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a content record (tests stand in for the CRUD layer).
    pub fn insert_content(&self, content: Content) {
        self.contents.write().insert(content.id.clone(), content);
    }

    pub fn messages(&self, chat_id: &str) -> Vec<ChatMessage> {
        self.chats
            .read()
            .get(chat_id)
            .map(|row| row.messages.clone())
            .unwrap_or_default()
    }

    pub fn last_active(&self, chat_id: &str) -> Option<DateTime<Utc>> {
        self.chats.read().get(chat_id).map(|row| row.last_active)
    }

    fn title_of(text: &str) -> String {
        let first_line = text.lines().next().unwrap_or("").trim();
        let title: String = first_line.chars().take(80).collect();
        if title.is_empty() {
            "Untitled".to_string()
        } else {
            title
        }
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn get_content(&self, content_id: &str, user_id: &str) -> Result<Option<Content>> {
        Ok(self
            .contents
            .read()
            .get(content_id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn get_source_info(
        &self,
        content_id: &str,
        user_id: &str,
    ) -> Result<Option<SourceInfo>> {
        let contents = self.contents.read();
        Ok(contents
            .get(content_id)
            .filter(|c| c.user_id == user_id)
            .map(|c| SourceInfo {
                content_id: c.id.clone(),
                title: Self::title_of(&c.text),
                url: None,
                metadata: serde_json::Map::new(),
            }))
    }

    async fn get_content_preview(
        &self,
        content_id: &str,
        user_id: &str,
        max_length: usize,
    ) -> Result<Option<String>> {
        let contents = self.contents.read();
        Ok(contents
            .get(content_id)
            .filter(|c| c.user_id == user_id)
            .map(|c| c.text.chars().take(max_length).collect()))
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn create_chat(&self, user_id: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.chats.write().insert(
            id.clone(),
            ChatRow {
                user_id: user_id.to_string(),
                last_active: Utc::now(),
                messages: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn chat_exists(&self, chat_id: &str) -> Result<bool> {
        Ok(self.chats.read().contains_key(chat_id))
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<()> {
        let mut chats = self.chats.write();
        let row = chats
            .get_mut(&message.chat_id)
            .ok_or_else(|| AppError::NotFound(format!("Chat '{}' not found", message.chat_id)))?;
        row.messages.push(message.clone());
        Ok(())
    }

    async fn patch_message_provenance(
        &self,
        chat_id: &str,
        message_id: &str,
        patch: &ProvenancePatch,
    ) -> Result<()> {
        let mut chats = self.chats.write();
        let row = chats
            .get_mut(chat_id)
            .ok_or_else(|| AppError::NotFound(format!("Chat '{}' not found", chat_id)))?;
        let message = row
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| AppError::NotFound(format!("Message '{}' not found", message_id)))?;

        message.content_id = Some(patch.content_id.clone());
        message.source_info = Some(patch.source_info.clone());
        message.attribution = Some(patch.attribution.clone());
        message.context_stats = Some(patch.context_stats);
        Ok(())
    }

    async fn touch_chat(&self, chat_id: &str) -> Result<()> {
        let mut chats = self.chats.write();
        let row = chats
            .get_mut(chat_id)
            .ok_or_else(|| AppError::NotFound(format!("Chat '{}' not found", chat_id)))?;
        row.last_active = Utc::now();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Answer generation.
//!
//! The full ask path: embed the query, retrieve and gate, assemble context,
//! trim it to the token budget, prompt the model, persist the exchange, and
//! hand provenance to the recorder.
//!
//! Provider instability must never break the chat: rate-limit and
//! authentication errors (and empty completions) degrade to an apology
//! string instead of surfacing as failures.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::prompt::{PromptKind, PromptTemplater, Tone};
use crate::chat::provenance::ProvenanceRecorder;
use crate::db::store::ChatStore;
use crate::llm::client::LlmClient;
use crate::rag::assembler::ContextAssembler;
use crate::rag::embeddings::Embedder;
use crate::rag::retriever::Retriever;
use crate::types::{Answer, AppError, ChatMessage, MessageRole, Result};

/// Shown instead of an answer when the provider is rate limited, rejects our
/// credentials, or returns nothing.
pub const DEGRADED_ANSWER: &str =
    "I'm having trouble reaching the language model right now. Please try again in a moment.";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Approximate token budget for the context portion of the prompt.
    pub max_context_tokens: usize,
    /// Characters-per-token heuristic used to apply the budget.
    pub chars_per_token: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 2000,
            chars_per_token: 4,
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// One user query against their stored knowledge.
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub user_id: String,
    /// Existing chat to append to; a missing or unknown id creates a chat.
    pub chat_id: Option<String>,
    pub query: String,
    pub kind: PromptKind,
    pub tone: Tone,
}

// ============================================================================
// Answer Generator
// ============================================================================

pub struct AnswerGenerator {
    embedder: Arc<dyn Embedder>,
    retriever: Retriever,
    assembler: ContextAssembler,
    templater: PromptTemplater,
    llm: Arc<dyn LlmClient>,
    chats: Arc<dyn ChatStore>,
    provenance: Arc<ProvenanceRecorder>,
    config: GeneratorConfig,
}

impl AnswerGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        retriever: Retriever,
        assembler: ContextAssembler,
        llm: Arc<dyn LlmClient>,
        chats: Arc<dyn ChatStore>,
        provenance: Arc<ProvenanceRecorder>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            embedder,
            retriever,
            assembler,
            templater: PromptTemplater::new(),
            llm,
            chats,
            provenance,
            config,
        }
    }

    /// Answer a query, persist the exchange, and kick off provenance.
    pub async fn ask(&self, request: AskRequest) -> Result<Answer> {
        let query_vector = self.embedder.embed(&request.query).await?;
        let retrieved = self
            .retriever
            .retrieve(&query_vector, &request.user_id)
            .await?;

        let assembled = self.assembler.assemble(&retrieved.context, &request.query);
        let context = self.trim_to_token_budget(&assembled.text);

        let prompt = self
            .templater
            .build_chat(&request.query, &context, request.kind, request.tone);

        let answer_text = match self.llm.generate_with_system(&prompt.system, &prompt.user).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(user_id = %request.user_id, "provider returned empty completion");
                DEGRADED_ANSWER.to_string()
            }
            Err(AppError::LlmRateLimited(e)) => {
                warn!(user_id = %request.user_id, error = %e, "provider rate limited");
                DEGRADED_ANSWER.to_string()
            }
            Err(AppError::LlmAuth(e)) => {
                warn!(user_id = %request.user_id, error = %e, "provider rejected credentials");
                DEGRADED_ANSWER.to_string()
            }
            Err(e) => return Err(e),
        };

        let (chat_id, created_chat) = self.resolve_chat(&request).await?;

        self.chats
            .append_message(&ChatMessage {
                id: Uuid::new_v4().to_string(),
                chat_id: chat_id.clone(),
                role: MessageRole::User,
                message: request.query.clone(),
                content_id: None,
                source_info: None,
                attribution: None,
                context_stats: None,
                created_at: Utc::now(),
            })
            .await?;

        // Provenance composes inline (so the response can cite its source)
        // but is patched onto the message in the background.
        let patch = if retrieved.gate_passed() {
            self.provenance
                .compose(
                    &retrieved.content_id,
                    &request.user_id,
                    retrieved.stats,
                    retrieved.source_count,
                )
                .await
        } else {
            None
        };

        let assistant_id = Uuid::new_v4().to_string();
        self.chats
            .append_message(&ChatMessage {
                id: assistant_id.clone(),
                chat_id: chat_id.clone(),
                role: MessageRole::Assistant,
                message: answer_text.clone(),
                content_id: None,
                source_info: None,
                attribution: None,
                context_stats: None,
                created_at: Utc::now(),
            })
            .await?;
        self.chats.touch_chat(&chat_id).await?;

        let (source_info, attribution) = match &patch {
            Some(patch) => (
                Some(patch.source_info.clone()),
                Some(patch.attribution.clone()),
            ),
            None => (None, None),
        };
        if let Some(patch) = patch {
            self.provenance
                .attach(chat_id.clone(), assistant_id, patch);
        }

        info!(
            user_id = %request.user_id,
            chat_id = %chat_id,
            gate_passed = retrieved.gate_passed(),
            "answer generated"
        );

        Ok(Answer {
            answer: answer_text,
            content_id: retrieved.content_id,
            chat_id,
            source_info,
            attribution,
            context_stats: retrieved.stats,
            created_chat,
        })
    }

    async fn resolve_chat(&self, request: &AskRequest) -> Result<(String, bool)> {
        if let Some(chat_id) = &request.chat_id {
            if self.chats.chat_exists(chat_id).await? {
                return Ok((chat_id.clone(), false));
            }
        }
        let chat_id = self.chats.create_chat(&request.user_id).await?;
        Ok((chat_id, true))
    }

    fn trim_to_token_budget(&self, context: &str) -> String {
        let max_chars = self.config.max_context_tokens * self.config.chars_per_token;
        if context.chars().count() > max_chars {
            context.chars().take(max_chars).collect()
        } else {
            context.to_string()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

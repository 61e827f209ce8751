//! LLM client abstraction and provider management.
//!
//! The language-model provider is an external collaborator: the answer
//! generator only depends on [`LlmClient`]. Streaming and tool calling are
//! deliberately absent - answers are single-shot completions.

use crate::types::{AppError, Result};
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with a system prompt.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection.
#[derive(Debug, Clone)]
pub enum Provider {
    /// Ollama local LLM provider.
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Create a client instance for this provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider feature is not enabled.
    pub async fn create_client(&self) -> Result<Box<dyn LlmClient>> {
        match self {
            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => {
                let client =
                    super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?;
                Ok(Box::new(client))
            }
            #[cfg(not(feature = "ollama"))]
            Provider::Ollama { .. } => Err(AppError::Configuration(
                "Ollama provider requires the 'ollama' feature".to_string(),
            )),
        }
    }
}

/// Map a raw provider error message to the error kind the answer generator
/// distinguishes: rate limiting and authentication failures get degraded
/// user-visible answers instead of hard failures.
pub fn classify_provider_error(message: String) -> AppError {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests")
    {
        AppError::LlmRateLimited(message)
    } else if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("forbidden")
        || lower.contains("api key")
    {
        AppError::LlmAuth(message)
    } else {
        AppError::Llm(message)
    }
}

//! Mock implementations for testing.
//!
//! Shared across integration test files: a deterministic embedder that needs
//! no model download, a configurable mock LLM client, and a stub extractor.

use async_trait::async_trait;
use parking_lot::Mutex;

use mnema::extract::{ContentExtractor, TaggedLink};
use mnema::llm::LlmClient;
use mnema::rag::embeddings::l2_normalize;
use mnema::rag::Embedder;
use mnema::types::{AppError, Result};

/// Deterministic bag-of-words embedder over a tiny fixed vocabulary.
///
/// Texts sharing vocabulary words point in similar directions, so retrieval
/// behaves like the real thing without loading a model. Texts with no
/// vocabulary hit map to a reserved dimension orthogonal to everything else.
pub struct VocabEmbedder {
    vocab: Vec<&'static str>,
}

impl Default for VocabEmbedder {
    fn default() -> Self {
        Self {
            vocab: vec![
                "rust",
                "ownership",
                "borrow",
                "memory",
                "safety",
                "lifetime",
                "compiler",
                "async",
            ],
        }
    }
}

impl VocabEmbedder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Embedder for VocabEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut values: Vec<f32> = self
            .vocab
            .iter()
            .map(|word| {
                lower
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|token| token == word)
                    .count() as f32
            })
            .collect();

        // Reserved dimension for texts with no vocabulary overlap at all.
        let no_hits = values.iter().all(|v| *v == 0.0);
        values.push(if no_hits { 1.0 } else { 0.0 });

        l2_normalize(&mut values);
        Ok(values)
    }

    fn dimensions(&self) -> usize {
        self.vocab.len() + 1
    }

    fn model_name(&self) -> &str {
        "vocab-mock"
    }
}

/// Mock LLM client with a fixed response or a fixed failure.
pub struct MockLlmClient {
    response: String,
    failure: Option<fn(String) -> AppError>,
    pub prompts_seen: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            failure: None,
            prompts_seen: Mutex::new(Vec::new()),
        }
    }

    /// Client that always fails with the given error constructor.
    pub fn failing(failure: fn(String) -> AppError) -> Self {
        Self {
            response: String::new(),
            failure: Some(failure),
            prompts_seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts_seen.lock().push(prompt.to_string());
        match self.failure {
            Some(make_error) => Err(make_error("mock provider failure".to_string())),
            None => Ok(self.response.clone()),
        }
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

/// Extractor stub: records attempted links, returns canned content.
#[derive(Default)]
pub struct StubExtractor {
    pub attempts: Mutex<Vec<TaggedLink>>,
    results: Mutex<Vec<(TaggedLink, String)>>,
}

impl StubExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(results: Vec<(TaggedLink, String)>) -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            results: Mutex::new(results),
        }
    }
}

#[async_trait]
impl ContentExtractor for StubExtractor {
    async fn extract_all(&self, links: &[TaggedLink]) -> Vec<(TaggedLink, String)> {
        self.attempts.lock().extend(links.iter().cloned());
        self.results.lock().clone()
    }
}

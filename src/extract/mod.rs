//! Extraction Fan-out
//!
//! Input text is scanned for URLs; each URL's hostname is classified into an
//! [`ExtractorKind`] and routed to the matching extractor:
//!
//! - `generic` - readability-style DOM-to-text over the fetched page
//! - `medium` - article DOM walk preserving heading/list/code structure
//! - `twitter` / `linkedin` - third-party content-resolution service
//!
//! Extraction failures are isolated per link: a failing link degrades to "no
//! content extracted" and the rest of the job proceeds. Invalid URLs are
//! filtered out before fan-out and logged, never retried.

pub mod generic;
pub mod medium;
pub mod social;

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::types::{AppError, Result};
use crate::utils::config::ExtractConfig;

// ============================================================================
// Extractor Kinds
// ============================================================================

/// Closed set of extractor capabilities, selected by hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExtractorKind {
    /// Readability-style extraction for any unrecognized domain.
    #[default]
    Generic,
    /// Structured article scrape for medium.com.
    Medium,
    /// Third-party resolution service.
    LinkedIn,
    /// Third-party resolution service.
    Twitter,
}

impl ExtractorKind {
    /// Classify a URL by hostname. Unmatched domains default to `Generic`.
    pub fn classify(url: &Url) -> Self {
        let host = url.host_str().unwrap_or("").to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        if host == "twitter.com" || host == "x.com" {
            Self::Twitter
        } else if host == "medium.com" || host.ends_with(".medium.com") {
            Self::Medium
        } else if host == "linkedin.com" || host.ends_with(".linkedin.com") {
            Self::LinkedIn
        } else {
            Self::Generic
        }
    }

    /// The tag stored in vector metadata for chunks of this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Medium => "medium",
            Self::LinkedIn => "linkedin",
            Self::Twitter => "twitter",
        }
    }
}

impl FromStr for ExtractorKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "medium" => Ok(Self::Medium),
            "linkedin" => Ok(Self::LinkedIn),
            "twitter" | "x" => Ok(Self::Twitter),
            _ => Err(AppError::InvalidInput(format!(
                "Unknown extractor kind: {}. Use: generic, medium, linkedin, twitter",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// ============================================================================
// Link Scanning
// ============================================================================

/// A URL found in submitted text, with its routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLink {
    pub url: String,
    pub kind: ExtractorKind,
}

/// Result of scanning submitted text for links.
#[derive(Debug, Clone)]
pub struct ScannedText {
    /// Valid links in order of appearance.
    pub links: Vec<TaggedLink>,
    /// The input with all URLs removed and whitespace collapsed.
    pub clean_text: String,
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("url pattern compiles"))
}

/// Scan text for embedded URLs. Invalid URLs are logged and dropped; they
/// are still removed from the clean text so they never get embedded as prose.
pub fn scan_text(text: &str) -> ScannedText {
    let mut links = Vec::new();

    for candidate in url_pattern().find_iter(text) {
        let raw = candidate.as_str().trim_end_matches(|c: char| {
            matches!(c, '.' | ',' | ';' | ')' | ']' | '>' | '"' | '\'')
        });
        match Url::parse(raw) {
            Ok(url) => {
                let kind = ExtractorKind::classify(&url);
                debug!(url = raw, tag = kind.tag(), "link classified");
                links.push(TaggedLink {
                    url: raw.to_string(),
                    kind,
                });
            }
            Err(e) => {
                warn!(url = raw, error = %e, "invalid link skipped");
            }
        }
    }

    let without_urls = url_pattern().replace_all(text, " ");
    let clean_text = without_urls.split_whitespace().collect::<Vec<_>>().join(" ");

    ScannedText { links, clean_text }
}

// ============================================================================
// Link Extractor
// ============================================================================

/// Capability interface the ingestion worker depends on; implemented by
/// [`LinkExtractor`] over real HTTP and by stubs in tests.
#[async_trait::async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extract all links sequentially, isolating per-link failures. Returns
    /// only the links that yielded content.
    async fn extract_all(&self, links: &[TaggedLink]) -> Vec<(TaggedLink, String)>;
}

/// Fetches and extracts readable text for tagged links.
pub struct LinkExtractor {
    http: reqwest::Client,
    config: ExtractConfig,
}

impl LinkExtractor {
    pub fn new(config: ExtractConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("mnema/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Extraction(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    /// Extract readable text for one link, dispatched by kind.
    pub async fn extract(&self, link: &TaggedLink) -> Result<String> {
        match link.kind {
            ExtractorKind::Generic => {
                let html = self.fetch(&link.url).await?;
                generic::readable_text(&html)
            }
            ExtractorKind::Medium => {
                let html = self.fetch(&link.url).await?;
                medium::article_text(&html)
            }
            ExtractorKind::Twitter | ExtractorKind::LinkedIn => {
                social::resolve(&self.http, &self.config, &link.url).await
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Extraction(format!("Fetch failed for {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Extraction(format!(
                "Fetch failed for {}: status {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Extraction(format!("Body read failed for {}: {}", url, e)))
    }
}

#[async_trait::async_trait]
impl ContentExtractor for LinkExtractor {
    /// Sequential on purpose: one extraction in flight bounds the load the
    /// single-concurrency worker puts on the network and the embedder. A
    /// failing link is logged and skipped; it never aborts the batch.
    async fn extract_all(&self, links: &[TaggedLink]) -> Vec<(TaggedLink, String)> {
        let mut extracted = Vec::new();
        for link in links {
            match self.extract(link).await {
                Ok(text) if !text.trim().is_empty() => {
                    extracted.push((link.clone(), text));
                }
                Ok(_) => {
                    warn!(url = %link.url, "no content extracted");
                }
                Err(e) => {
                    warn!(url = %link.url, error = %e, "extraction failed, link skipped");
                }
            }
        }
        extracted
    }
}

// ============================================================================
// Tests
// ============================================================================

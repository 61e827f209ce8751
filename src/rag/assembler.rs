//! Query-time context assembly.
//!
//! Retrieved text rarely fits a prompt as-is. The assembler re-chunks it with
//! overlap (unlike the ingestion chunker, which slices blindly), scores every
//! chunk against the query, and greedily packs the best chunks into a bounded
//! context.
//!
//! Chunk size is ~30% of the target context length with 10% overlap, and a
//! chunk boundary snaps back to the last sentence terminator found after 70%
//! of the chunk, so cuts land between sentences instead of inside them.
//!
//! Scoring:
//!
//! ```text
//! raw   = key_term_hits * 0.3 + query_word_hits * 0.2
//! score = min(raw / (key_terms * 0.3 + query_words * 0.2), 1.0)
//! ```
//!
//! which keeps every score inside [0, 1] regardless of the query.

const KEY_TERM_WEIGHT: f32 = 0.3;
const QUERY_WORD_WEIGHT: f32 = 0.2;

/// Words too common to act as key terms.
const STOPWORDS: &[&str] = &[
    "the", "this", "that", "with", "from", "what", "when", "where", "which", "have", "does",
    "about", "your", "their", "there", "were", "will", "would", "could", "should", "than", "then",
    "them", "they", "been", "being", "into", "over", "only", "also", "just", "some", "such",
    "very", "more", "most", "other", "after", "before", "because", "while", "these", "those",
    "please", "tell",
];

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Target maximum length of the assembled context, in characters.
    pub max_context_length: usize,
    /// Chunks scoring below this are discarded before packing.
    pub min_chunk_score: f32,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_context_length: 2000,
            min_chunk_score: 0.3,
        }
    }
}

// ============================================================================
// Assembled Context
// ============================================================================

/// A chunk with its query-relevance score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
}

/// Result of assembling context for a query.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    /// Chunks produced before score filtering.
    pub chunks_considered: usize,
    /// Chunks (possibly one truncated) packed into the output.
    pub chunks_used: usize,
    /// Whether the last packed chunk was truncated to fit.
    pub truncated: bool,
}

// ============================================================================
// Context Assembler
// ============================================================================

pub struct ContextAssembler {
    config: AssemblerConfig,
}

impl ContextAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    /// Chunk `source`, score against `query`, and pack the best chunks into
    /// at most `max_context_length` characters.
    pub fn assemble(&self, source: &str, query: &str) -> AssembledContext {
        let chunks = self.overlap_chunks(source);
        let chunks_considered = chunks.len();

        let key_terms = extract_key_terms(query);
        let query_words = significant_words(query, 2);

        let mut scored: Vec<ScoredChunk> = chunks
            .into_iter()
            .map(|text| {
                let score = score_chunk(&text, &key_terms, &query_words);
                ScoredChunk { text, score }
            })
            .filter(|chunk| chunk.score >= self.config.min_chunk_score)
            .collect();

        // Stable sort: equal scores keep document order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let (text, chunks_used, truncated) = self.pack(&scored);
        AssembledContext {
            text,
            chunks_considered,
            chunks_used,
            truncated,
        }
    }

    /// Overlapping windows over `source`, snapped to sentence boundaries.
    fn overlap_chunks(&self, source: &str) -> Vec<String> {
        let chars: Vec<char> = source.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        let chunk_size = (self.config.max_context_length * 30 / 100).max(1);
        let overlap = chunk_size / 10;
        let snap_offset = chunk_size * 70 / 100;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let mut end = (start + chunk_size).min(total);

            // Snap to the last '.' after 70% of the chunk, except on the tail.
            if end < total {
                let snap_from = start + snap_offset;
                if let Some(dot) = chars[snap_from..end].iter().rposition(|&c| c == '.') {
                    end = snap_from + dot + 1;
                }
            }

            chunks.push(chars[start..end].iter().collect());
            if end >= total {
                break;
            }

            let next = end.saturating_sub(overlap);
            start = if next > start { next } else { end };
        }

        chunks
    }

    fn pack(&self, scored: &[ScoredChunk]) -> (String, usize, bool) {
        let budget = self.config.max_context_length;
        let mut out = String::new();
        let mut out_chars = 0;
        let mut used = 0;
        let mut truncated = false;

        for chunk in scored {
            let sep_chars = if out.is_empty() { 0 } else { 2 };
            let chunk_chars = chunk.text.chars().count();

            if out_chars + sep_chars + chunk_chars <= budget {
                if sep_chars > 0 {
                    out.push_str("\n\n");
                }
                out.push_str(&chunk.text);
                out_chars += sep_chars + chunk_chars;
                used += 1;
                continue;
            }

            // First chunk that cannot fit ends the packing; keep a truncated
            // piece only when a meaningful amount of budget remains.
            let remaining = budget.saturating_sub(out_chars + sep_chars);
            if remaining >= 100 {
                if sep_chars > 0 {
                    out.push_str("\n\n");
                }
                out.extend(chunk.text.chars().take(remaining));
                used += 1;
                truncated = true;
            }
            break;
        }

        (out, used, truncated)
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Key terms of a query: lowercase words longer than three characters that
/// are not stopwords, deduplicated in order of appearance.
pub fn extract_key_terms(query: &str) -> Vec<String> {
    let mut terms = significant_words(query, 3);
    terms.retain(|word| !STOPWORDS.contains(&word.as_str()));
    terms
}

fn significant_words(query: &str, min_len: usize) -> Vec<String> {
    let mut words = Vec::new();
    for word in query.split_whitespace() {
        let cleaned: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if cleaned.chars().count() > min_len && !words.contains(&cleaned) {
            words.push(cleaned);
        }
    }
    words
}

fn score_chunk(text: &str, key_terms: &[String], query_words: &[String]) -> f32 {
    let max_possible =
        key_terms.len() as f32 * KEY_TERM_WEIGHT + query_words.len() as f32 * QUERY_WORD_WEIGHT;
    if max_possible <= 0.0 {
        return 0.0;
    }

    let lower = text.to_lowercase();
    let key_hits = key_terms.iter().filter(|t| lower.contains(t.as_str())).count();
    let word_hits = query_words
        .iter()
        .filter(|w| lower.contains(w.as_str()))
        .count();

    let raw = key_hits as f32 * KEY_TERM_WEIGHT + word_hits as f32 * QUERY_WORD_WEIGHT;
    (raw / max_possible).min(1.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assembler(max_len: usize) -> ContextAssembler {
        ContextAssembler::new(AssemblerConfig {
            max_context_length: max_len,
            min_chunk_score: 0.3,
        })
    }

    #[test]
    fn test_key_terms_filter_short_and_stopwords() {
        let terms = extract_key_terms("What is the Rust borrow checker?");
        assert_eq!(terms, vec!["rust".to_string(), "borrow".to_string(), "checker".to_string()]);
    }

    #[rstest]
    #[case("What is Rust?", "Rust is a systems language.")]
    #[case("", "anything")]
    #[case("ownership borrowing lifetimes", "unrelated text entirely")]
    #[case("a b c", "short query words only")]
    fn test_score_stays_in_unit_interval(#[case] query: &str, #[case] text: &str) {
        let key_terms = extract_key_terms(query);
        let query_words = significant_words(query, 2);
        let score = score_chunk(text, &key_terms, &query_words);
        assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
    }

    #[test]
    fn test_full_match_scores_one() {
        let query = "ownership borrowing";
        let key_terms = extract_key_terms(query);
        let query_words = significant_words(query, 2);
        let score = score_chunk("ownership and borrowing explained", &key_terms, &query_words);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_match_scores_zero() {
        let key_terms = extract_key_terms("ownership");
        let query_words = significant_words("ownership", 2);
        assert_eq!(score_chunk("completely unrelated", &key_terms, &query_words), 0.0);
    }

    #[test]
    fn test_output_never_exceeds_budget() {
        let source = "Rust ownership model explained in detail. ".repeat(100);
        for max_len in [200, 500, 1000, 2000] {
            let assembled = assembler(max_len).assemble(&source, "Rust ownership model");
            assert!(
                assembled.text.chars().count() <= max_len,
                "{} chars exceeds budget {}",
                assembled.text.chars().count(),
                max_len
            );
        }
    }

    #[test]
    fn test_chunks_snap_to_sentence_boundary() {
        // chunk_size = 300 for a 1000-char budget; sentences are ~50 chars, so
        // every non-final chunk must end with a terminator.
        let source = "The borrow checker enforces aliasing rules at compile time. ".repeat(20);
        let a = assembler(1000);
        let chunks = a.overlap_chunks(&source);
        assert!(chunks.len() > 1);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.trim_end().ends_with('.'),
                "chunk does not end at a sentence: {:?}",
                &chunk[chunk.len().saturating_sub(30)..]
            );
        }
    }

    #[test]
    fn test_chunks_overlap() {
        let source: String = ('a'..='z').cycle().take(2000).collect();
        let a = assembler(1000);
        let chunks = a.overlap_chunks(&source);
        assert!(chunks.len() > 1);
        // No sentence terminators, so windows are raw: each successive chunk
        // starts inside the previous one.
        let first: Vec<char> = chunks[0].chars().collect();
        let second: Vec<char> = chunks[1].chars().collect();
        let overlap = 300 / 10;
        assert_eq!(&first[first.len() - overlap..], &second[..overlap]);
    }

    #[test]
    fn test_low_scoring_chunks_discarded() {
        let relevant = "Rust ownership guarantees memory safety. ".repeat(5);
        let noise = "Completely unrelated filler material here. ".repeat(5);
        let source = format!("{}{}", noise, relevant);

        let assembled = assembler(400).assemble(&source, "Rust ownership memory safety");
        assert!(assembled.text.contains("ownership"));
        assert!(assembled.chunks_used <= assembled.chunks_considered);
    }

    #[test]
    fn test_empty_source() {
        let assembled = assembler(1000).assemble("", "query");
        assert_eq!(assembled.text, "");
        assert_eq!(assembled.chunks_considered, 0);
        assert_eq!(assembled.chunks_used, 0);
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let source = "Ownership rules. Borrowing rules. Lifetime rules. ".repeat(30);
        let query = "ownership borrowing lifetimes";
        let a = assembler(800);
        let first = a.assemble(&source, query);
        let second = a.assemble(&source, query);
        assert_eq!(first.text, second.text);
        assert_eq!(first.chunks_used, second.chunks_used);
    }
}

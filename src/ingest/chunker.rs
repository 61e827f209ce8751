/// Splits text into fixed-size windows for ingestion.
///
/// Plain slicing on character boundaries: no overlap, no boundary snapping.
/// The query-time assembler is the overlap-aware one; this stays dumb so the
/// same text and chunk size always produce the same sequence of chunks.
pub struct TextChunker {
    chunk_size: usize,
}

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

impl TextChunker {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();

        for window in chars.chunks(self.chunk_size) {
            chunks.push(window.iter().collect());
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_short_text() {
        let chunker = TextChunker::new(1000);
        let chunks = chunker.chunk("hello world");
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_chunk_exact_boundaries() {
        let chunker = TextChunker::new(4);
        let chunks = chunker.chunk("abcdefgh");
        assert_eq!(chunks, vec!["abcd".to_string(), "efgh".to_string()]);
    }

    #[test]
    fn test_chunk_trailing_remainder() {
        let chunker = TextChunker::new(4);
        let chunks = chunker.chunk("abcdefghij");
        assert_eq!(
            chunks,
            vec!["abcd".to_string(), "efgh".to_string(), "ij".to_string()]
        );
    }

    #[test]
    fn test_chunk_empty_text() {
        let chunker = TextChunker::default();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_chunk_multibyte_boundaries() {
        // Slicing must never split a multi-byte character.
        let chunker = TextChunker::new(2);
        let chunks = chunker.chunk("héllø");
        assert_eq!(
            chunks,
            vec!["hé".to_string(), "ll".to_string(), "ø".to_string()]
        );
    }

    #[test]
    fn test_chunk_deterministic() {
        let chunker = TextChunker::new(7);
        let text = "the quick brown fox jumps over the lazy dog";
        assert_eq!(chunker.chunk(text), chunker.chunk(text));
    }
}

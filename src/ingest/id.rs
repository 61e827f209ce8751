use sha2::{Digest, Sha256};

/// Deterministic chunk identifier: SHA-256 over the source key and the chunk
/// index, hex-encoded.
///
/// The source key is either the originating URL or the clean text body. The
/// id is the sole deduplication mechanism: the worker asks the vector store
/// whether the id exists before spending compute on an embedding, so the same
/// text at the same index can never produce a second record.
pub fn chunk_id(source_key: &str, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_key.as_bytes());
    hasher.update(b"|");
    hasher.update(index.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

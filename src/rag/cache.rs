//! Embedding vector cache.
//!
//! Re-embedding unchanged text is pure waste, so computed vectors are cached
//! behind a SHA-256 key of `text | model`. The cache is bytes-bounded with
//! least-recently-used eviction; entries never expire on their own because an
//! embedding for a given (text, model) pair never goes stale.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Configuration & Stats
// ============================================================================

/// Configuration for the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum cache size in bytes (default: 64MB).
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
    /// Whether the cache is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_max_size_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            enabled: default_enabled(),
        }
    }
}

/// Counters for cache performance monitoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size_bytes: u64,
    pub entry_count: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

// ============================================================================
// LRU Cache
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    values: Vec<f32>,
    last_accessed: Instant,
    size_bytes: usize,
}

/// In-memory LRU cache for embedding vectors. Thread-safe.
pub struct LruEmbeddingCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: CacheConfig,
    current_size: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LruEmbeddingCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            current_size: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn with_max_size(max_size_bytes: u64) -> Self {
        Self::new(CacheConfig {
            max_size_bytes,
            ..Default::default()
        })
    }

    /// Cache key for a (text, model) pair.
    pub fn compute_key(&self, text: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(b"|");
        hasher.update(model.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        if !self.config.enabled {
            return None;
        }

        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = Instant::now();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.values.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: &str, values: Vec<f32>) {
        if !self.config.enabled {
            return;
        }

        let size_bytes = values.len() * std::mem::size_of::<f32>();
        if self.current_size.load(Ordering::Relaxed) + size_bytes as u64
            > self.config.max_size_bytes
        {
            self.evict_lru(size_bytes);
        }

        let mut entries = self.entries.write();
        if let Some(old) = entries.remove(key) {
            self.current_size
                .fetch_sub(old.size_bytes as u64, Ordering::Relaxed);
        }
        self.current_size
            .fetch_add(size_bytes as u64, Ordering::Relaxed);
        entries.insert(
            key.to_string(),
            CacheEntry {
                values,
                last_accessed: Instant::now(),
                size_bytes,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        self.current_size.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size_bytes: self.current_size.load(Ordering::Relaxed),
            entry_count: self.entries.read().len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn evict_lru(&self, needed_bytes: usize) {
        let mut entries = self.entries.write();
        let target_size = self
            .config
            .max_size_bytes
            .saturating_sub(needed_bytes as u64);

        while self.current_size.load(Ordering::Relaxed) > target_size && !entries.is_empty() {
            let lru_key = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());

            match lru_key {
                Some(key) => {
                    if let Some(entry) = entries.remove(&key) {
                        self.current_size
                            .fetch_sub(entry.size_bytes as u64, Ordering::Relaxed);
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let cache = LruEmbeddingCache::with_defaults();
        let key1 = cache.compute_key("hello", "bge-small");
        let key2 = cache.compute_key("hello", "bge-small");
        let key3 = cache.compute_key("hello", "bge-base");
        let key4 = cache.compute_key("other", "bge-small");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_ne!(key1, key4);
    }

    #[test]
    fn test_set_and_get() {
        let cache = LruEmbeddingCache::with_defaults();
        let key = cache.compute_key("hello", "m");

        assert!(cache.get(&key).is_none());
        cache.set(&key, vec![1.0, 2.0, 3.0]);
        assert_eq!(cache.get(&key).unwrap(), vec![1.0, 2.0, 3.0]);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_lru_eviction() {
        // 32 bytes = two 4-float vectors.
        let cache = LruEmbeddingCache::with_max_size(32);
        cache.set("a", vec![1.0, 2.0, 3.0, 4.0]);
        cache.set("b", vec![5.0, 6.0, 7.0, 8.0]);

        // Touch "b" so "a" is the least recently used.
        assert!(cache.get("b").is_some());
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_some());

        cache.set("c", vec![9.0, 10.0, 11.0, 12.0]);

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = LruEmbeddingCache::new(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        cache.set("k", vec![1.0]);
        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn test_update_replaces_entry() {
        let cache = LruEmbeddingCache::with_defaults();
        cache.set("k", vec![1.0, 2.0]);
        cache.set("k", vec![3.0, 4.0, 5.0]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k").unwrap(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_clear() {
        let cache = LruEmbeddingCache::with_defaults();
        cache.set("k", vec![1.0]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().size_bytes, 0);
    }
}

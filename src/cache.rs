//! # Response Cache Module
//!
//! ## Purpose
//! Content-addressed, versioned, TTL-based store for expensive generation
//! results. Caching is an optimization, never a correctness dependency:
//! every failure path degrades to a miss or a dropped write.
//!
//! ## Input/Output Specification
//! - **Input**: Deterministic keys derived from request-defining fields,
//!   generated response strings
//! - **Output**: Cached responses until expiry, version bump or eviction
//! - **Keys**: `rcache:v{N}:{short identifiers}:{sha256 prefix of body}`
//!
//! ## Key Features
//! - Short identifiers lead the key for readability and truncation safety;
//!   large prompt bodies are hashed, never embedded
//! - TTL expiry and version-namespace sweeping keep bounded storage clean
//! - Oldest-first eviction with a single retry on write failure

use crate::config::CacheConfig;
use crate::errors::Result;
use crate::storage::KvStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const NAMESPACE: &str = "rcache";

/// One cached generation result
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    /// The generated response
    response: String,
    /// Creation time, epoch milliseconds
    created_at: i64,
    /// Cache format version at creation time
    version: u32,
}

/// Content-addressed response cache over an injected key-value store
pub struct ResponseCache {
    store: Arc<dyn KvStore>,
    config: CacheConfig,
}

impl ResponseCache {
    /// Create a cache over the given store.
    ///
    /// Entries left behind by older cache format versions are swept
    /// immediately; storage is bounded, so orphaned namespaces must not
    /// outlive a version bump.
    pub fn new(store: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        let cache = Self { store, config };
        cache.sweep_stale();
        cache
    }

    fn prefix(&self) -> String {
        format!("{}:v{}:", NAMESPACE, self.config.version)
    }

    /// Build a deterministic key from the request-defining fields.
    ///
    /// Short identifiers (jurisdiction, language, section title) are placed
    /// first; the potentially large prompt body contributes only a hash so
    /// keys stay bounded.
    pub fn make_key(&self, identifiers: &[&str], body: &str) -> String {
        let head: Vec<String> = identifiers
            .iter()
            .map(|id| {
                id.trim()
                    .to_lowercase()
                    .chars()
                    .map(|c| if c == ':' || c.is_whitespace() { '-' } else { c })
                    .collect()
            })
            .collect();

        let digest = Sha256::digest(body.as_bytes());
        let hash: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();

        format!("{}{}:{}", self.prefix(), head.join(":"), hash)
    }

    /// Look up a cached response. Expired or corrupt entries are deleted and
    /// reported as a miss; storage errors are misses too.
    pub fn get(&self, key: &str) -> Option<String> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read failed for '{}': {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Corrupt cache entry '{}', deleting: {}", key, e);
                let _ = self.store.remove(key);
                return None;
            }
        };

        if entry.version != self.config.version {
            let _ = self.store.remove(key);
            return None;
        }

        let ttl_ms = self.config.ttl_hours as i64 * 3600 * 1000;
        let age_ms = Utc::now().timestamp_millis() - entry.created_at;
        if age_ms > ttl_ms {
            tracing::debug!("Cache entry '{}' expired ({}ms old)", key, age_ms);
            let _ = self.store.remove(key);
            return None;
        }

        Some(entry.response)
    }

    /// Store a response. On write failure the oldest half of the cache is
    /// evicted and the write retried once; a second failure is dropped
    /// silently since caching is best-effort.
    pub fn set(&self, key: &str, response: &str) {
        let entry = CacheEntry {
            response: response.to_string(),
            created_at: Utc::now().timestamp_millis(),
            version: self.config.version,
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry '{}': {}", key, e);
                return;
            }
        };

        if self.store.set(key, &raw).is_ok() {
            return;
        }

        tracing::warn!("Cache write failed for '{}', evicting oldest entries", key);
        if let Err(e) = self.evict_oldest_half() {
            tracing::warn!("Cache eviction failed: {}", e);
        }
        if let Err(e) = self.store.set(key, &raw) {
            tracing::warn!("Cache write failed again for '{}', giving up: {}", key, e);
        }
    }

    /// Delete the oldest half of the current namespace's entries
    fn evict_oldest_half(&self) -> Result<()> {
        let keys = self.store.list_keys(&self.prefix())?;
        let mut aged: Vec<(i64, String)> = Vec::with_capacity(keys.len());

        for key in keys {
            match self.store.get(&key) {
                Ok(Some(raw)) => match serde_json::from_str::<CacheEntry>(&raw) {
                    Ok(entry) => aged.push((entry.created_at, key)),
                    // Unparseable entries are dead weight, drop them outright.
                    Err(_) => {
                        let _ = self.store.remove(&key);
                    }
                },
                _ => {
                    let _ = self.store.remove(&key);
                }
            }
        }

        aged.sort_by_key(|(created_at, _)| *created_at);
        let evict_count = (aged.len() + 1) / 2;
        for (_, key) in aged.into_iter().take(evict_count) {
            let _ = self.store.remove(&key);
        }
        tracing::info!("Evicted {} cache entries", evict_count);
        Ok(())
    }

    /// Delete entries left behind by older cache format versions.
    ///
    /// Runs at construction; exposed so long-lived processes can re-sweep
    /// after a runtime version change.
    pub fn sweep_stale(&self) -> usize {
        let prefix = self.prefix();
        let keys = match self.store.list_keys(&format!("{}:", NAMESPACE)) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Cache sweep failed to list keys: {}", e);
                return 0;
            }
        };

        let mut swept = 0;
        for key in keys {
            if !key.starts_with(&prefix) && self.store.remove(&key).is_ok() {
                swept += 1;
            }
        }
        if swept > 0 {
            tracing::info!("Swept {} stale cache entries from old versions", swept);
        }
        swept
    }

    /// Remove every cached entry regardless of version namespace
    pub fn invalidate_all(&self) -> usize {
        let keys = match self.store.list_keys(&format!("{}:", NAMESPACE)) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Cache invalidation failed to list keys: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in &keys {
            if self.store.remove(key).is_ok() {
                removed += 1;
            }
        }
        tracing::info!("Invalidated {} cache entries", removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;
    use parking_lot::Mutex;

    fn cache_over(store: Arc<dyn KvStore>) -> ResponseCache {
        ResponseCache::new(store, CacheConfig::default())
    }

    #[test]
    fn test_round_trip() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = cache_over(store);
        let key = cache.make_key(&["de", "arbeitsstätten"], "long prompt body");
        cache.set(&key, "generated document text");
        assert_eq!(cache.get(&key).as_deref(), Some("generated document text"));
    }

    #[test]
    fn test_key_is_deterministic_and_bounded() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = cache_over(store);
        let body = "prompt ".repeat(10_000);
        let k1 = cache.make_key(&["de", "Gefährdungsbeurteilung Lager"], &body);
        let k2 = cache.make_key(&["de", "Gefährdungsbeurteilung Lager"], &body);
        assert_eq!(k1, k2);
        assert!(k1.len() < 120);
        assert!(k1.starts_with("rcache:v"));
        // Identifiers stay readable up front.
        assert!(k1.contains("gefährdungsbeurteilung-lager"));
    }

    #[test]
    fn test_different_bodies_different_keys() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = cache_over(store);
        let k1 = cache.make_key(&["de"], "prompt one");
        let k2 = cache.make_key(&["de"], "prompt two");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_expired_entry_removed() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = ResponseCache::new(store.clone(), CacheConfig::default());
        let key = cache.make_key(&["de"], "prompt");

        // Simulate an entry written two days ago.
        let stale = CacheEntry {
            response: "old".to_string(),
            created_at: Utc::now().timestamp_millis() - 48 * 3600 * 1000,
            version: CacheConfig::default().version,
        };
        store
            .set(&key, &serde_json::to_string(&stale).unwrap())
            .unwrap();

        assert!(cache.get(&key).is_none());
        // The expired entry is gone from the store, not just hidden.
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry_treated_as_miss_and_deleted() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = ResponseCache::new(store.clone(), CacheConfig::default());
        store.set("rcache:v3:de:abcd", "{not json").unwrap();
        assert!(cache.get("rcache:v3:de:abcd").is_none());
        assert!(store.get("rcache:v3:de:abcd").unwrap().is_none());
    }

    #[test]
    fn test_sweep_removes_old_version_namespace() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = ResponseCache::new(store.clone(), CacheConfig::default());

        store.set("rcache:v1:de:old", "{}").unwrap();
        store.set("rcache:v2:de:old", "{}").unwrap();
        let key = cache.make_key(&["de"], "prompt");
        cache.set(&key, "fresh");

        let swept = cache.sweep_stale();
        assert_eq!(swept, 2);
        assert_eq!(cache.get(&key).as_deref(), Some("fresh"));
    }

    #[test]
    fn test_construction_sweeps_old_version_namespaces() {
        let store = Arc::new(MemoryKvStore::new());
        store.set("rcache:v1:de:old", "{}").unwrap();
        store.set("rcache:v2:de:old", "{}").unwrap();
        store.set("rate:unlocked", "true").unwrap();

        let cache = ResponseCache::new(store.clone(), CacheConfig::default());

        // Old namespaces are gone as soon as the cache exists; unrelated
        // keys are untouched.
        assert!(store.get("rcache:v1:de:old").unwrap().is_none());
        assert!(store.get("rcache:v2:de:old").unwrap().is_none());
        assert_eq!(store.get("rate:unlocked").unwrap().as_deref(), Some("true"));

        let key = cache.make_key(&["de"], "prompt");
        cache.set(&key, "fresh");
        assert_eq!(cache.get(&key).as_deref(), Some("fresh"));
    }

    #[test]
    fn test_invalidate_all_clears_every_namespace() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = ResponseCache::new(store.clone(), CacheConfig::default());
        store.set("rcache:v1:de:old", "{}").unwrap();
        let key = cache.make_key(&["de"], "prompt");
        cache.set(&key, "fresh");

        let removed = cache.invalidate_all();
        assert_eq!(removed, 2);
        assert!(cache.get(&key).is_none());
    }

    /// Store that rejects writes once it holds `capacity` entries, simulating
    /// a full backing store.
    struct FullStore {
        inner: MemoryKvStore,
        capacity: usize,
        rejected: Mutex<usize>,
    }

    impl KvStore for FullStore {
        fn get(&self, key: &str) -> crate::errors::Result<Option<String>> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> crate::errors::Result<()> {
            if self.inner.len() >= self.capacity {
                *self.rejected.lock() += 1;
                return Err(crate::errors::AssistError::Storage {
                    details: "store full".to_string(),
                });
            }
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> crate::errors::Result<()> {
            self.inner.remove(key)
        }
        fn list_keys(&self, prefix: &str) -> crate::errors::Result<Vec<String>> {
            self.inner.list_keys(prefix)
        }
    }

    #[test]
    fn test_eviction_and_retry_on_write_failure() {
        let store = Arc::new(FullStore {
            inner: MemoryKvStore::new(),
            capacity: 4,
            rejected: Mutex::new(0),
        });
        let cache = ResponseCache::new(store.clone(), CacheConfig::default());

        for i in 0..4 {
            let key = cache.make_key(&["de"], &format!("prompt {}", i));
            cache.set(&key, &format!("response {}", i));
        }
        assert_eq!(store.inner.len(), 4);

        // Store is full: the next write evicts the oldest half and retries.
        let key = cache.make_key(&["de"], "prompt overflow");
        cache.set(&key, "overflow response");

        assert!(*store.rejected.lock() >= 1);
        assert_eq!(cache.get(&key).as_deref(), Some("overflow response"));
        assert!(store.inner.len() <= 4);
    }
}

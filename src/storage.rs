//! # Storage Management Module
//!
//! ## Purpose
//! Persistent key-value storage for rate state and the response cache, behind
//! a small trait so tests and ephemeral deployments can swap in an in-memory
//! store.
//!
//! ## Input/Output Specification
//! - **Input**: String keys and values from the cache and orchestrator
//! - **Output**: Durable storage surviving process restarts (sled) or
//!   process-local storage (memory)
//! - **Storage**: Sled embedded database, optional gzip for large values
//!
//! ## Key Features
//! - Prefix listing for namespace sweeps and bulk invalidation
//! - Transparent compression of large stored values
//! - DashMap-backed in-memory implementation for tests

use crate::config::StorageConfig;
use crate::errors::{AssistError, Result};
use dashmap::DashMap;
use std::io::{Read, Write};

/// Minimal key-value capability consumed by the cache and orchestrator.
///
/// Must survive process restarts for rate state; may be best-effort for the
/// response cache.
pub trait KvStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove a value; absent keys are not an error
    fn remove(&self, key: &str) -> Result<()>;
    /// List all keys starting with the prefix
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Durable store backed by a sled tree
pub struct SledKvStore {
    db: sled::Db,
    tree: sled::Tree,
    config: StorageConfig,
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl SledKvStore {
    /// Open (or create) the store at the configured path
    pub fn open(config: StorageConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(&config.db_path).map_err(|e| AssistError::Storage {
            details: format!("Failed to open database {:?}: {}", config.db_path, e),
        })?;
        let tree = db.open_tree("kv")?;

        tracing::info!(
            "Key-value store opened at {:?} ({} entries)",
            config.db_path,
            tree.len()
        );
        Ok(Self { db, tree, config })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn encode(&self, value: &str) -> Result<Vec<u8>> {
        if self.config.enable_compression
            && value.len() >= self.config.compression_threshold_bytes
        {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(value.as_bytes())
                .map_err(|e| AssistError::Storage {
                    details: format!("Compression failed: {}", e),
                })?;
            encoder.finish().map_err(|e| AssistError::Storage {
                details: format!("Compression finish failed: {}", e),
            })
        } else {
            Ok(value.as_bytes().to_vec())
        }
    }

    fn decode(&self, data: &[u8]) -> Result<String> {
        if data.starts_with(&GZIP_MAGIC) {
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut decompressed = String::new();
            decoder
                .read_to_string(&mut decompressed)
                .map_err(|e| AssistError::Storage {
                    details: format!("Decompression failed: {}", e),
                })?;
            Ok(decompressed)
        } else {
            String::from_utf8(data.to_vec()).map_err(|e| AssistError::Storage {
                details: format!("Stored value is not valid UTF-8: {}", e),
            })
        }
    }
}

impl KvStore for SledKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.tree.get(key.as_bytes())? {
            Some(data) => Ok(Some(self.decode(&data)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let data = self.encode(value)?;
        self.tree.insert(key.as_bytes(), data)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.tree.remove(key.as_bytes())?;
        Ok(())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for item in self.tree.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            let key = String::from_utf8(key.to_vec()).map_err(|e| AssistError::Storage {
                details: format!("Stored key is not valid UTF-8: {}", e),
            })?;
            keys.push(key);
        }
        Ok(keys)
    }
}

/// Process-local store for tests and ephemeral deployments
#[derive(Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, String>,
}

impl MemoryKvStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sled_store() -> (SledKvStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            db_path: dir.path().join("kv.db"),
            enable_compression: true,
            compression_threshold_bytes: 64,
        };
        (SledKvStore::open(config).unwrap(), dir)
    }

    #[test]
    fn test_sled_round_trip() {
        let (store, _dir) = sled_store();
        store.set("rate:last_request", "1724668800000").unwrap();
        assert_eq!(
            store.get("rate:last_request").unwrap().as_deref(),
            Some("1724668800000")
        );
        store.remove("rate:last_request").unwrap();
        assert!(store.get("rate:last_request").unwrap().is_none());
    }

    #[test]
    fn test_sled_compression_round_trip() {
        let (store, _dir) = sled_store();
        // Above the 64 byte threshold, so the value goes through gzip.
        let value = "Bei Raumtemperaturen über 26 Grad Celsius sind Maßnahmen zu ergreifen. "
            .repeat(20);
        store.set("rcache:v3:big", &value).unwrap();
        assert_eq!(store.get("rcache:v3:big").unwrap().as_deref(), Some(value.as_str()));
    }

    #[test]
    fn test_sled_prefix_listing() {
        let (store, _dir) = sled_store();
        store.set("rcache:v3:a", "1").unwrap();
        store.set("rcache:v3:b", "2").unwrap();
        store.set("rate:unlocked", "true").unwrap();

        let mut keys = store.list_keys("rcache:").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["rcache:v3:a", "rcache:v3:b"]);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryKvStore::new();
        store.set("k1", "v1").unwrap();
        store.set("k2", "v2").unwrap();
        assert_eq!(store.get("k1").unwrap().as_deref(), Some("v1"));
        assert_eq!(store.list_keys("k").unwrap().len(), 2);
        store.remove("k1").unwrap();
        assert!(store.get("k1").unwrap().is_none());
        assert_eq!(store.len(), 1);
    }
}

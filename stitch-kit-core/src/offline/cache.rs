//! Key-addressed cache of serialized collections with metadata bookkeeping.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Mutex;

const METADATA_FILE: &str = "cache-metadata.json";

/// Bookkeeping record for one cached collection.
///
/// The metadata table is the source of truth for presence: a payload file
/// without a metadata entry is treated as absent, and `store` writes the
/// payload before the metadata so an entry never points at a missing file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub item_count: usize,
    pub byte_size: u64,
    /// SHA-256 digest of the payload, hex-encoded. Consumed by backup
    /// tooling and checked on load to catch torn or tampered files.
    pub checksum: String,
    pub last_updated: DateTime<Utc>,
}

/// Read-only aggregate over all cache entries, computed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheInfo {
    pub total_items: usize,
    pub total_bytes: u64,
    pub keys: Vec<String>,
    pub oldest_update: Option<DateTime<Utc>>,
}

/// Errors surfaced by mutating cache calls.
///
/// Misses and corrupt payloads are deliberately not errors; `load` folds
/// both into `None`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error for {0}: {1}")]
    Io(PathBuf, #[source] io::Error),
    #[error("failed to serialize cache payload for '{0}': {1}")]
    Serialize(String, String),
    #[error("failed to persist cache metadata: {0}")]
    Metadata(String),
}

/// Disk-backed store of serialized collections, one payload file per key
/// plus a single metadata table.
///
/// Mutations on the same key are serialized through a per-key lock;
/// operations on distinct keys only contend on the metadata table itself.
/// Entries never expire; the cache is advisory and caller-driven.
pub struct ContentCache {
    dir: PathBuf,
    entries: Mutex<HashMap<String, CacheEntry>>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ContentCache {
    /// Opens the cache rooted at `dir`, creating it if needed and loading
    /// the metadata table a previous process left behind. An unreadable
    /// table is treated as an empty cache, not an error.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io(dir.clone(), e))?;

        let meta_path = dir.join(METADATA_FILE);
        let entries = match std::fs::read(&meta_path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("cache: unreadable metadata table, starting empty: {}", e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(CacheError::Io(meta_path, e)),
        };

        Ok(Self {
            dir,
            entries: Mutex::new(entries),
            key_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the payload path for a key. The file name keeps a readable
    /// prefix of the key and appends a digest suffix so distinct keys never
    /// collide after sanitization.
    pub fn payload_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let digest = hex_digest(key.as_bytes());
        self.dir.join(format!("{}-{}.json", safe, &digest[..8]))
    }

    /// Serializes `items` and stores them under `key`, overwriting any
    /// previous entry. If anything fails before the metadata write, the
    /// prior entry (if any) remains authoritative.
    pub async fn store<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), CacheError> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let json = serde_json::to_vec(items)
            .map_err(|e| CacheError::Serialize(key.to_string(), e.to_string()))?;
        let path = self.payload_path(key);
        std::fs::write(&path, &json).map_err(|e| CacheError::Io(path, e))?;

        let entry = CacheEntry {
            key: key.to_string(),
            item_count: items.len(),
            byte_size: json.len() as u64,
            checksum: hex_digest(&json),
            last_updated: Utc::now(),
        };

        let mut entries = self.entries.lock().await;
        let previous = entries.insert(key.to_string(), entry);
        if let Err(e) = persist_metadata(&self.dir, &entries) {
            // Roll back so memory keeps matching the durable table.
            match previous {
                Some(prev) => entries.insert(key.to_string(), prev),
                None => entries.remove(key),
            };
            return Err(e);
        }
        tracing::debug!("cache: stored {} item(s) under '{}'", items.len(), key);
        Ok(())
    }

    /// Returns the cached collection for `key`, or `None` when there is no
    /// entry, the payload is missing, or it fails verification. Offline-first
    /// callers treat all three identically, so none of them is an error.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let entry = self.entries.lock().await.get(key).cloned()?;

        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let bytes = std::fs::read(self.payload_path(key)).ok()?;
        if hex_digest(&bytes) != entry.checksum {
            tracing::warn!("cache: checksum mismatch for '{}', treating as miss", key);
            return None;
        }
        serde_json::from_slice(&bytes).ok()
    }

    /// Metadata for one key, if present.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Deletes payload and metadata for one key. Removing an absent key is
    /// not an error.
    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let mut entries = self.entries.lock().await;
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = persist_metadata(&self.dir, &entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        drop(entries);

        // Metadata no longer references the payload, so a leftover file is
        // already invisible; deletion is cleanup.
        remove_file_if_exists(&self.payload_path(key))?;
        Ok(())
    }

    /// Deletes every payload and the entire metadata table.
    pub async fn clear_all(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        let previous = std::mem::take(&mut *entries);
        if let Err(e) = persist_metadata(&self.dir, &entries) {
            *entries = previous;
            return Err(e);
        }
        drop(entries);

        for key in previous.keys() {
            if let Err(e) = remove_file_if_exists(&self.payload_path(key)) {
                tracing::warn!("cache: failed to delete payload for '{}': {}", key, e);
            }
        }
        Ok(())
    }

    /// Aggregates over current metadata. O(number of keys).
    pub async fn info(&self) -> CacheInfo {
        let entries = self.entries.lock().await;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        CacheInfo {
            total_items: entries.values().map(|e| e.item_count).sum(),
            total_bytes: entries.values().map(|e| e.byte_size).sum(),
            keys,
            oldest_update: entries.values().map(|e| e.last_updated).min(),
        }
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn persist_metadata(
    dir: &Path,
    entries: &HashMap<String, CacheEntry>,
) -> Result<(), CacheError> {
    let json = serde_json::to_vec_pretty(entries).map_err(|e| CacheError::Metadata(e.to_string()))?;
    std::fs::write(dir.join(METADATA_FILE), json).map_err(|e| CacheError::Metadata(e.to_string()))
}

fn remove_file_if_exists(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::Io(path.to_path_buf(), e)),
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use tempfile::TempDir;

    fn test_cache() -> (ContentCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = ContentCache::open(temp_dir.path().join("cache")).unwrap();
        (cache, temp_dir)
    }

    /// Type whose serialization always fails, for exercising the failed
    /// `store` path without touching the filesystem.
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refusing to serialize"))
        }
    }

    #[tokio::test]
    async fn test_store_and_load_roundtrip() {
        let (cache, _temp) = test_cache();
        let items = vec!["a".to_string(), "b".to_string()];

        cache.store("projects", &items).await.unwrap();

        let loaded: Vec<String> = cache.load("projects").await.unwrap();
        assert_eq!(loaded, items);

        let entry = cache.entry("projects").await.unwrap();
        assert_eq!(entry.item_count, 2);
        assert!(entry.byte_size > 0);
    }

    #[tokio::test]
    async fn test_load_missing_key_is_none() {
        let (cache, _temp) = test_cache();
        let loaded: Option<Vec<String>> = cache.load("nothing").await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_metadata_is_source_of_truth() {
        let (cache, _temp) = test_cache();
        cache.store("projects", &["a".to_string()]).await.unwrap();

        // Payload vanished out from under the metadata table.
        std::fs::remove_file(cache.payload_path("projects")).unwrap();

        let loaded: Option<Vec<String>> = cache.load("projects").await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_a_miss() {
        let (cache, _temp) = test_cache();
        cache.store("projects", &["a".to_string()]).await.unwrap();

        std::fs::write(cache.payload_path("projects"), b"garbage").unwrap();

        let loaded: Option<Vec<String>> = cache.load("projects").await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_failed_store_keeps_previous_entry() {
        let (cache, _temp) = test_cache();
        cache.store("projects", &["v1".to_string()]).await.unwrap();

        let result = cache.store("projects", &[Unserializable]).await;
        assert!(result.is_err());

        // The prior value is still authoritative.
        let loaded: Vec<String> = cache.load("projects").await.unwrap();
        assert_eq!(loaded, vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_payload_write_leaves_metadata_untouched() {
        let (cache, _temp) = test_cache();

        // Occupy the payload path with a directory so the write must fail.
        std::fs::create_dir(cache.payload_path("blocked")).unwrap();

        let result = cache.store("blocked", &["x".to_string()]).await;
        assert!(result.is_err());

        let loaded: Option<Vec<String>> = cache.load("blocked").await;
        assert!(loaded.is_none());
        assert!(cache.info().await.keys.is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (cache, _temp) = test_cache();
        cache.store("projects", &["a".to_string()]).await.unwrap();

        cache.remove("projects").await.unwrap();
        cache.remove("projects").await.unwrap();
        cache.remove("never-existed").await.unwrap();

        let loaded: Option<Vec<String>> = cache.load("projects").await;
        assert!(loaded.is_none());
        assert!(!cache.payload_path("projects").exists());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let (cache, _temp) = test_cache();
        cache.store("projects", &["a".to_string()]).await.unwrap();
        cache.store("fabrics", &["b".to_string()]).await.unwrap();

        cache.clear_all().await.unwrap();

        let info = cache.info().await;
        assert_eq!(info.total_items, 0);
        assert!(info.keys.is_empty());
        assert!(!cache.payload_path("projects").exists());
        assert!(!cache.payload_path("fabrics").exists());
    }

    #[tokio::test]
    async fn test_info_aggregates() {
        let (cache, _temp) = test_cache();
        cache.store("projects", &["a".to_string(), "b".to_string()]).await.unwrap();
        cache.store("fabrics", &["c".to_string()]).await.unwrap();

        let info = cache.info().await;
        assert_eq!(info.total_items, 3);
        assert_eq!(info.keys, vec!["fabrics".to_string(), "projects".to_string()]);
        assert!(info.total_bytes > 0);

        let oldest = info.oldest_update.unwrap();
        let projects = cache.entry("projects").await.unwrap();
        assert!(oldest <= projects.last_updated);
    }

    #[tokio::test]
    async fn test_metadata_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("cache");

        let cache = ContentCache::open(&dir).unwrap();
        cache.store("projects", &["a".to_string()]).await.unwrap();
        drop(cache);

        let reopened = ContentCache::open(&dir).unwrap();
        let loaded: Vec<String> = reopened.load("projects").await.unwrap();
        assert_eq!(loaded, vec!["a".to_string()]);
        assert_eq!(reopened.info().await.total_items, 1);
    }

    #[tokio::test]
    async fn test_corrupt_metadata_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("cache");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(METADATA_FILE), b"not json").unwrap();

        let cache = ContentCache::open(&dir).unwrap();
        assert!(cache.info().await.keys.is_empty());
    }

    #[test]
    fn test_payload_path_sanitizes_and_disambiguates() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ContentCache::open(temp_dir.path().join("cache")).unwrap();

        let a = cache.payload_path("projects?status=active");
        let b = cache.payload_path("projects_status=active");
        assert_ne!(a, b);
        assert!(a.file_name().unwrap().to_str().unwrap().starts_with("projects_status_active-"));
    }
}

//! Scan cache: Moka in-memory, keyed by content hash.
//! Same ecosystem, path, and content always produce the same scan.

use std::sync::Arc;

use moka::sync::Cache;
use xxhash_rust::xxh3::Xxh3;

use crate::types::FileScan;

/// Bounded map from [`ScanCache::key`] to a finished scan. Shared across
/// the batch workers.
pub struct ScanCache {
    inner: Cache<u64, Arc<FileScan>>,
}

impl ScanCache {
    /// Cache holding at most `capacity` scans.
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    /// Cache key for one input. The path is part of the key because it is
    /// recorded on every endpoint.
    pub fn key(ecosystem: &str, path: &str, source: &str) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.update(ecosystem.as_bytes());
        hasher.update(&[0]);
        hasher.update(path.as_bytes());
        hasher.update(&[0]);
        hasher.update(source.as_bytes());
        hasher.digest()
    }

    /// The scan stored for `key`, if still resident.
    pub fn get(&self, key: u64) -> Option<Arc<FileScan>> {
        self.inner.get(&key)
    }

    /// Store `scan` under `key`, replacing any previous entry.
    pub fn insert(&self, key: u64, scan: Arc<FileScan>) {
        self.inner.insert(key, scan);
    }

    /// Approximate number of resident scans. Eviction is asynchronous, so
    /// the count may lag recent inserts.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for ScanCache {
    fn default() -> Self {
        Self::new(routemap_core::constants::DEFAULT_CACHE_CAPACITY)
    }
}

//! Lookup cache interface.
//!
//! One cache instance is built at process start and shared by every
//! provider call. Writes are first-writer-wins: once a key holds a value,
//! later `put`s for it are ignored.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{CacheKey, CachedValue};

#[derive(Debug)]
pub enum CacheError {
    /// Backing store could not be opened or created.
    Open(String),
    /// Read or write against the store failed.
    Storage(String),
    /// A stored row could not be decoded.
    Corrupt(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(msg) => write!(f, "cannot open cache: {msg}"),
            Self::Storage(msg) => write!(f, "cache storage error: {msg}"),
            Self::Corrupt(msg) => write!(f, "corrupt cache entry: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

pub trait GeocodeCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>, CacheError>;

    /// Store `value` unless `key` already has one.
    fn put(&self, key: &CacheKey, value: &CachedValue) -> Result<(), CacheError>;

    fn has(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }
}

/// Process-lifetime cache. Used in tests and when no cache file is wanted.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, CachedValue>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GeocodeCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &CacheKey, value: &CachedValue) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(key.clone()).or_insert_with(|| value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, ProviderId};

    #[test]
    fn first_writer_wins() {
        let cache = MemoryCache::new();
        let key = CacheKey::new(ProviderId::Gsi, "東京都渋谷区神南1-2-3");
        let first = CachedValue::Coordinate(Coordinate::new(35.0, 139.0));
        cache.put(&key, &first).unwrap();
        cache.put(&key, &CachedValue::NotFound).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn providers_do_not_share_entries() {
        let cache = MemoryCache::new();
        let google = CacheKey::new(ProviderId::Google, "addr");
        let gsi = CacheKey::new(ProviderId::Gsi, "addr");
        cache.put(&google, &CachedValue::NotFound).unwrap();
        assert!(cache.has(&google).unwrap());
        assert!(!cache.has(&gsi).unwrap());
    }
}

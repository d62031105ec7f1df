//! Result cache for aggregation queries.
//!
//! Entries carry the data timestamp they were computed from, so a cached
//! result self-invalidates the moment newer snapshots exist, independent of
//! the TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
    /// Latest underlying snapshot timestamp when the value was computed.
    data_timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct QueryCacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            max_entries: 200,
        }
    }
}

/// TTL-bounded, size-bounded cache keyed by query string.
pub struct QueryCache<T> {
    config: QueryCacheConfig,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(config: QueryCacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value when it is within TTL and was computed from
    /// the same data timestamp the caller sees now.
    pub fn get(&self, key: &str, data_timestamp: i64) -> Option<T> {
        let mut entries = self.entries.lock().unwrap();

        let valid = match entries.get(key) {
            Some(entry) => {
                entry.inserted_at.elapsed() < self.config.ttl
                    && entry.data_timestamp == data_timestamp
            }
            None => return None,
        };

        if !valid {
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn put(&self, key: String, value: T, data_timestamp: i64) {
        let mut entries = self.entries.lock().unwrap();

        if entries.len() >= self.config.max_entries && !entries.contains_key(&key) {
            // Evict the oldest entry.
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                data_timestamp,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

//! Row cache keyed by (entity type, primary key).

use crate::core::Row;
use lazy_static::lazy_static;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Capacity of the process-wide cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

lazy_static! {
    static ref GLOBAL_CACHE: Arc<LruObjectCache> =
        Arc::new(LruObjectCache::new(DEFAULT_CACHE_CAPACITY));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub entity: &'static str,
    pub id: i64,
}

impl CacheKey {
    pub fn new(entity: &'static str, id: i64) -> Self {
        Self { entity, id }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Storage for the most recently loaded row of each record.
pub trait ObjectCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Row>;
    fn put(&self, key: CacheKey, row: Row);
    fn evict(&self, key: &CacheKey) -> bool;
    /// Drops every row of one entity type. Returns how many were dropped.
    fn clear_entity(&self, entity: &str) -> usize;
    fn clear(&self);
    fn len(&self) -> usize;
    fn stats(&self) -> CacheStats;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded least-recently-used cache.
pub struct LruObjectCache {
    rows: Mutex<LruCache<CacheKey, Row>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LruObjectCache {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            rows: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Process-wide instance shared by every record that does not inject its own.
    pub fn global() -> Arc<LruObjectCache> {
        GLOBAL_CACHE.clone()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    // A panic while holding the lock leaves the map itself intact.
    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Row>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObjectCache for LruObjectCache {
    fn get(&self, key: &CacheKey) -> Option<Row> {
        let row = self.lock().get(key).cloned();
        let counter = if row.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        row
    }

    fn put(&self, key: CacheKey, row: Row) {
        self.lock().put(key, row);
    }

    fn evict(&self, key: &CacheKey) -> bool {
        self.lock().pop(key).is_some()
    }

    fn clear_entity(&self, entity: &str) -> usize {
        let mut rows = self.lock();
        let doomed: Vec<CacheKey> = rows
            .iter()
            .filter(|(key, _)| key.entity == entity)
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            rows.pop(key);
        }
        doomed.len()
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn row(name: &str) -> Row {
        vec![Value::Integer(1), Value::from(name)]
    }

    #[test]
    fn test_get_put_evict() {
        let cache = LruObjectCache::new(8);
        let key = CacheKey::new("Screen", 1);
        assert_eq!(cache.get(&key), None);

        cache.put(key, row("Lobby"));
        assert_eq!(cache.get(&key), Some(row("Lobby")));
        assert!(cache.evict(&key));
        assert!(!cache.evict(&key));
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_clear_entity_keeps_other_types() {
        let cache = LruObjectCache::new(8);
        cache.put(CacheKey::new("Screen", 1), row("a"));
        cache.put(CacheKey::new("Screen", 2), row("b"));
        cache.put(CacheKey::new("Room", 1), row("c"));

        assert_eq!(cache.clear_entity("Screen"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&CacheKey::new("Room", 1)).is_some());
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let cache = LruObjectCache::new(2);
        for id in 1..=3 {
            cache.put(CacheKey::new("Screen", id), row("x"));
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&CacheKey::new("Screen", 1)), None);
        assert_eq!(LruObjectCache::new(0).capacity(), 1);
    }
}

//! Entity identity cache
//!
//! Maps `(kind, id)` to the single in-memory handle for that resource, so
//! every lookup through one session resolves to the same instance.
//!
//! The cache is bounded. Insertion order is tracked and, once the capacity
//! is exceeded, the oldest-inserted entry is evicted (FIFO, not LRU): reading
//! an entry does not refresh its position. Eviction only drops the cache's
//! reference; handles already held by callers stay valid and loadable.

use crate::entity::{Handle, Record};
use lims_model::{EntityKind, LimsId};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Default number of live entries
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Cache key: the same id string may name both an artifact and a process
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    /// Entity kind
    pub kind: EntityKind,
    /// Identifier within the kind
    pub id: LimsId,
}

impl EntityKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(kind: EntityKind, id: LimsId) -> Self {
        Self { kind, id }
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Entries evicted since creation
    pub evictions: u64,
}

/// Bounded FIFO identity map
#[derive(Debug)]
pub struct EntityCache {
    entries: HashMap<EntityKey, Arc<dyn Any + Send + Sync>>,
    order: VecDeque<EntityKey>,
    capacity: usize,
    evictions: u64,
}

impl EntityCache {
    /// Create cache with max capacity (at least one entry)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            evictions: 0,
        }
    }

    /// Cached handle, if present
    #[must_use]
    pub fn get<R: Record>(&self, id: &LimsId) -> Option<Handle<R>> {
        let key = EntityKey::new(R::KIND, id.clone());
        self.entries
            .get(&key)
            .cloned()
            .and_then(Handle::from_erased)
    }

    /// Existing handle for `id`, or a new unloaded one registered in the cache
    ///
    /// Registering a new entry may evict the oldest one.
    pub fn get_or_create<R: Record>(&mut self, id: &LimsId) -> Handle<R> {
        if let Some(handle) = self.get::<R>(id) {
            return handle;
        }

        let handle = Handle::<R>::detached(id.clone());
        let key = EntityKey::new(R::KIND, id.clone());
        if self.entries.insert(key.clone(), handle.erased()).is_none() {
            self.order.push_back(key);
        }
        self.evict_oldest_if_over_capacity();
        handle
    }

    /// Evict the single oldest entry if the cache is over capacity
    ///
    /// Returns the evicted key.
    pub fn evict_oldest_if_over_capacity(&mut self) -> Option<EntityKey> {
        if self.order.len() <= self.capacity {
            return None;
        }
        let oldest = self.order.pop_front()?;
        self.entries.remove(&oldest);
        self.evictions += 1;
        tracing::trace!(kind = %oldest.kind, id = %oldest.id, "evicted oldest cache entry");
        Some(oldest)
    }

    /// Drop the entry for `(kind, id)`
    ///
    /// Returns true if an entry was removed.
    pub fn remove(&mut self, kind: EntityKind, id: &LimsId) -> bool {
        let key = EntityKey::new(kind, id.clone());
        if self.entries.remove(&key).is_none() {
            return false;
        }
        self.order.retain(|k| k != &key);
        true
    }

    /// Check if cache contains `(kind, id)`
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: EntityKind, id: &LimsId) -> bool {
        self.entries.contains_key(&EntityKey::new(kind, id.clone()))
    }

    /// Keys in insertion order, oldest first
    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.order.iter()
    }

    /// Get entry count
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len(),
            capacity: self.capacity,
            evictions: self.evictions,
        }
    }
}

impl Default for EntityCache {
    /// Create cache with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

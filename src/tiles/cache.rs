//! Bounded in-memory cache of tile descriptors.

use crate::tiles::layer::{TileDescriptor, TileKey};
use fxhash::FxBuildHasher;
use lru::LruCache;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Default number of descriptors retained
pub const DEFAULT_CAPACITY: usize = 256;

/// Insertion-ordered descriptor cache with a fixed capacity.
///
/// Eviction is strictly oldest-inserted-first: lookups never promote an
/// entry, so a tile that keeps being returned by queries is still evicted
/// when its insertion turn comes. Trimming happens after a query batch via
/// [`TileCache::trim`], not on every insert.
pub struct TileCache {
    cache: Mutex<LruCache<TileKey, TileDescriptor, FxBuildHasher>>,
    capacity: usize,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::unbounded_with_hasher(FxBuildHasher::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Non-promoting lookup
    pub fn get(&self, key: &TileKey) -> Option<TileDescriptor> {
        self.lock().peek(key).cloned()
    }

    pub fn insert(&self, key: TileKey, descriptor: TileDescriptor) {
        self.lock().put(key, descriptor);
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.lock().contains(key)
    }

    /// Drops oldest-inserted entries until at or under capacity
    pub fn trim(&self) {
        let mut cache = self.lock();
        while cache.len() > self.capacity {
            cache.pop_lru();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<TileKey, TileDescriptor, FxBuildHasher>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl fmt::Debug for TileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

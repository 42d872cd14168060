use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::entry::CachedResponse;
use crate::key::CacheKey;

type Entries = HashMap<CacheKey, CachedResponse>;

/// Process-lifetime response cache shared by every request task.
///
/// A single lock guards the whole map. It is held only for the map access
/// itself; callers buffer bodies and talk to the origin outside of it.
/// Entries never expire and are never evicted individually.
#[derive(Debug, Default)]
pub struct CacheStore {
    inner: RwLock<Entries>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.read().get(key).cloned()
    }

    /// Inserts or overwrites the entry for `key`. Last writer wins.
    pub fn put(&self, key: CacheKey, entry: CachedResponse) {
        let replaced = self.write().insert(key, entry).is_some();
        debug!(target: "hoard::cache", replaced, "Stored cache entry");
    }

    /// Atomically replaces the map with an empty one.
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut *self.write()).len();
        debug!(target: "hoard::cache", dropped, "Cache cleared");
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written entry
    // (insert/take are single operations), so a poisoned map is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

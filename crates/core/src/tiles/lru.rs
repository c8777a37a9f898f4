use fnv::{FnvBuildHasher, FnvHashMap};
use indexmap::IndexMap;
use log::debug;
use std::{fmt::Debug, hash::Hash};

/// Running totals for a [LruCache]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// A bounded map that evicts the least recently used entry once it grows
/// past capacity. Entries can be pinned to protect them from eviction while
/// something depends on them; pinned entries may push the cache over
/// capacity until they're released.
///
/// Entries are kept in recency order, oldest first, so eviction scans from
/// the front for the first unpinned key.
#[derive(Clone, Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    entries: IndexMap<K, V, FnvBuildHasher>,
    /// Pin counts. A key may be pinned more than once, and stays pinned
    /// until every pin is released.
    pins: FnvHashMap<K, usize>,
    stats: CacheStats,
}

impl<K: Copy + Debug + Eq + Hash, V> LruCache<K, V> {
    /// Create an empty cache. Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: IndexMap::default(),
            pins: FnvHashMap::default(),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Look at an entry without marking it as used or counting a hit/miss
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Get an entry and mark it as most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.get_mut(key).map(|value| &*value)
    }

    /// Get an entry mutably and mark it as most recently used
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if self.touch(key) {
            self.stats.hits += 1;
            self.entries.get_mut(key)
        } else {
            self.stats.misses += 1;
            None
        }
    }

    /// Insert or replace an entry, marking it most recently used. Returns
    /// the previous value, if any. May evict older entries.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self
            .entries
            .shift_remove_entry(&key)
            .map(|(_, previous)| previous);
        self.entries.insert(key, value);
        self.evict();
        previous
    }

    /// Protect an entry from eviction until [Self::unpin] is called the same
    /// number of times. The key doesn't have to be cached yet.
    pub fn pin(&mut self, key: K) {
        *self.pins.entry(key).or_insert(0) += 1;
    }

    /// Release one pin on a key. Once the last pin is gone, the cache shrinks
    /// back down to capacity if the pins had pushed it over.
    pub fn unpin(&mut self, key: &K) {
        if let Some(count) = self.pins.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.pins.remove(key);
                self.evict();
            }
        }
    }

    /// Move an entry to the back of the recency order. Returns false if the
    /// key isn't cached.
    fn touch(&mut self, key: &K) -> bool {
        match self.entries.shift_remove_entry(key) {
            Some((key, value)) => {
                self.entries.insert(key, value);
                true
            }
            None => false,
        }
    }

    /// Drop least recently used entries until the cache fits its capacity,
    /// skipping pinned ones. The most recent entry is never evicted.
    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            let last = self.entries.len() - 1;
            let victim = self
                .entries
                .keys()
                .take(last)
                .position(|key| !self.pins.contains_key(key));
            match victim {
                Some(index) => {
                    let removed = self.entries.shift_remove_index(index);
                    if let Some((key, _)) = removed {
                        debug!("Evicted {:?} from cache", key);
                        self.stats.evictions += 1;
                    }
                }
                // Everything left is pinned
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recent() {
        let mut cache = LruCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        // Touch 1 so 2 becomes the oldest
        assert_eq!(cache.get(&1), Some(&"a"));
        cache.insert(3, "c");
        assert!(cache.peek(&1).is_some());
        assert!(cache.peek(&2).is_none());
        assert!(cache.peek(&3).is_some());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 0,
                evictions: 1
            }
        );
    }

    #[test]
    fn test_peek_does_not_touch() {
        let mut cache = LruCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        assert_eq!(cache.peek(&1), Some(&"a"));
        cache.insert(3, "c");
        assert!(cache.peek(&1).is_none());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_pinned_survive() {
        let mut cache = LruCache::new(2);
        cache.pin(1);
        cache.pin(1);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(3, "c");
        // 1 is pinned, so 2 goes instead
        assert!(cache.peek(&1).is_some());
        assert!(cache.peek(&2).is_none());

        cache.pin(3);
        cache.insert(4, "d");
        // Over capacity while both old entries are pinned
        assert_eq!(cache.len(), 3);
        cache.unpin(&1);
        assert_eq!(cache.len(), 3);
        cache.unpin(&1);
        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&1).is_none());
        assert!(cache.peek(&3).is_some());
        assert!(cache.peek(&4).is_some());
    }

    #[test]
    fn test_insert_replaces() {
        let mut cache = LruCache::new(2);
        assert_eq!(cache.insert(1, "a"), None);
        assert_eq!(cache.insert(1, "b"), Some("a"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&1), Some(&"b"));
    }
}

//! Per-operation result cache with LRU eviction, and a filter predicate so
//! an operation can opt out of caching entirely (spec.md §4.1 "Operation
//! caches" / §5's note that some homomorphism variants are never cached).
//! Grounded on `sdd::mem::cache` (filter chain + LRU list + hash table) and
//! on the pack-wide use of the `lru` crate for exactly this shape of
//! problem (seen in several `other_examples/` manifests).
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

/// Caches the result of evaluating operations keyed by `K`, skipping any key
/// for which `should_cache` returns false.
pub struct OpCache<K: Eq + Hash, V: Clone> {
    cache: LruCache<K, V>,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash, V: Clone> OpCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        OpCache { cache: LruCache::new(capacity), hits: 0, misses: 0 }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.cache.get(key) {
            Some(v) => {
                self.hits += 1;
                log::trace!("op cache hit ({} hits, {} misses)", self.hits, self.misses);
                Some(v.clone())
            }
            None => {
                self.misses += 1;
                log::trace!("op cache miss ({} hits, {} misses)", self.hits, self.misses);
                None
            }
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.cache.put(key, value);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { hits: self.hits, misses: self.misses, len: self.cache.len() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

/// Evaluates `compute` through `cache`, unless `should_cache(&key)` is
/// false, in which case the cache is bypassed entirely on both read and
/// write (some homomorphism variants, e.g. plain `id`, are cheap enough that
/// caching them only adds overhead and cache pressure).
pub fn cached<K, V>(
    cache: &mut OpCache<K, V>,
    key: K,
    should_cache: impl FnOnce(&K) -> bool,
    compute: impl FnOnce() -> V,
) -> V
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    if !should_cache(&key) {
        return compute();
    }
    if let Some(hit) = cache.get(&key) {
        return hit;
    }
    let value = compute();
    cache.insert(key, value.clone());
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let mut cache: OpCache<u32, u32> = OpCache::new(8);
        let mut calls = 0;
        for _ in 0..3 {
            cached(&mut cache, 1, |_| true, || {
                calls += 1;
                10
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn filtered_keys_bypass_the_cache() {
        let mut cache: OpCache<u32, u32> = OpCache::new(8);
        let mut calls = 0;
        for _ in 0..3 {
            cached(&mut cache, 1, |_| false, || {
                calls += 1;
                10
            });
        }
        assert_eq!(calls, 3);
        assert_eq!(cache.stats().len, 0);
    }

    #[test]
    fn eviction_respects_capacity() {
        let mut cache: OpCache<u32, u32> = OpCache::new(1);
        cache.insert(1, 100);
        cache.insert(2, 200);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(200));
    }
}

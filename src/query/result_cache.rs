use std::num::NonZeroUsize;

use lru::LruCache;

/// LRU of resolved doc-id sequences keyed by [`QueryPlan::cache_key`]
/// (§4.6). Any query whose canonical key has not changed reuses the same
/// vector across pages.
pub struct ResultCache {
    inner: LruCache<String, Vec<u32>>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        ResultCache { inner: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()) }
    }

    pub fn get(&mut self, key: &str) -> Option<Vec<u32>> {
        self.inner.get(key).cloned()
    }

    pub fn put(&mut self, key: String, order: Vec<u32>) {
        self.inner.put(key, order);
    }
}

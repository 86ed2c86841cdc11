//! In-memory page cache
//!
//! Maps normalized paths to previously fetched page payloads. Entries are
//! trusted indefinitely once fetched: there is no eviction, TTL, or
//! capacity bound. Content volume for a single browsing session is small,
//! so the unbounded growth is a known, accepted limitation rather than a
//! defect.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cache statistics snapshot
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Cached pages
    pub entries: usize,
    /// Lookup hits
    pub hits: u64,
    /// Lookup misses
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate over all lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Page payload cache, shared by prefetch and navigation
pub struct PageCache {
    pages: DashMap<String, Arc<str>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PageCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a page payload
    pub fn get(&self, path: &str) -> Option<Arc<str>> {
        match self.pages.get(path) {
            Some(payload) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a page payload, overwriting any previous entry for the path
    ///
    /// Returns the stored payload so callers can use it without re-reading.
    pub fn put(&self, path: impl Into<String>, payload: impl Into<Arc<str>>) -> Arc<str> {
        let path = path.into();
        let payload = payload.into();
        debug!(path = %path, bytes = payload.len(), "caching page");
        self.pages.insert(path, payload.clone());
        payload
    }

    /// Whether a path is cached; does not count toward hit/miss stats
    pub fn contains(&self, path: &str) -> bool {
        self.pages.contains_key(path)
    }

    /// Number of cached pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.pages.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let cache = PageCache::new();
        cache.put("/blog", "<html>blog</html>");

        let payload = cache.get("/blog").unwrap();
        assert_eq!(&*payload, "<html>blog</html>");
        assert!(cache.contains("/blog"));
    }

    #[test]
    fn miss_returns_none() {
        let cache = PageCache::new();
        assert!(cache.get("/absent").is_none());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn put_overwrites() {
        let cache = PageCache::new();
        cache.put("/blog", "old");
        cache.put("/blog", "new");

        assert_eq!(&*cache.get("/blog").unwrap(), "new");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn contains_does_not_count_as_lookup() {
        let cache = PageCache::new();
        cache.contains("/blog");

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[test]
    fn never_evicts() {
        let cache = PageCache::new();
        for i in 0..500 {
            cache.put(format!("/page/{i}"), "payload");
        }
        assert_eq!(cache.len(), 500);
        assert!(cache.contains("/page/0"));
    }

    #[test]
    fn hit_rate() {
        let cache = PageCache::new();
        cache.put("/a", "x");
        cache.get("/a");
        cache.get("/b");

        let stats = cache.stats();
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}

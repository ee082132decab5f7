//! A memory-bounded LRU cache of decoded thumbnails.
//!
//! The cache is shared between the UI thread (reads while painting) and loader threads
//! (inserts on completion). A single mutex guards all of its state.
use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use albumgrid_state::GroupKey;
use lru::LruCache;
use serde::Serialize;

use crate::thumbnail::Thumbnail;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Returned when an insert cannot be stored.
pub enum PutError {
    /// The item alone is larger than the whole budget.
    TooLarge {
        /// The size of the rejected item.
        byte_size: usize,
        /// The cache budget.
        budget: usize,
    },
}
impl std::fmt::Display for PutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PutError::TooLarge { byte_size, budget } => write!(
                f,
                "thumbnail of {byte_size} bytes exceeds the cache budget of {budget} bytes"
            ),
        }
    }
}
impl std::error::Error for PutError {}

/// Counters and sizes, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub rejections: u64,
    pub entries: usize,
    pub used_bytes: usize,
    pub budget_bytes: usize,
}

struct CacheEntry {
    thumbnail: Thumbnail,
    byte_size: usize,
    last_access: Instant,
}

struct CacheInner {
    entries: LruCache<GroupKey, CacheEntry>,
    /// Keys whose thumbnail could never fit; misses for the rest of the session.
    rejected: HashSet<GroupKey>,
    used: usize,
    budget: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    rejections: u64,
}
impl CacheInner {
    fn evict_to_fit(&mut self, bytes_needed: usize) -> Vec<GroupKey> {
        let mut evicted = vec![];
        while self.used + bytes_needed > self.budget {
            let Some((key, entry)) = self.entries.pop_lru() else {
                break;
            };
            self.used -= entry.byte_size;
            self.evictions += 1;
            tracing::debug!(
                "Evicting thumbnail for {key} ({} bytes, idle for {:?})",
                entry.byte_size,
                entry.last_access.elapsed()
            );
            evicted.push(key);
        }
        evicted
    }
}

pub struct ThumbnailCache {
    inner: Mutex<CacheInner>,
}
impl ThumbnailCache {
    /// Creates a cache holding at most `budget` bytes of thumbnails. A zero budget is
    /// raised to one byte.
    pub fn new(budget: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                rejected: HashSet::new(),
                used: 0,
                budget: budget.max(1),
                hits: 0,
                misses: 0,
                evictions: 0,
                rejections: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // Every mutation leaves the state consistent before it can panic, so a poisoned
        // lock is still safe to use.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up a thumbnail, marking it most recently used on a hit.
    pub fn get(&self, key: &GroupKey) -> Option<Thumbnail> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = Instant::now();
                let thumbnail = entry.thumbnail.clone();
                inner.hits += 1;
                Some(thumbnail)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Whether a thumbnail is cached, without touching recency or counters.
    pub fn contains(&self, key: &GroupKey) -> bool {
        self.lock().entries.contains(key)
    }

    /// Whether an insert for this key was rejected for being over budget.
    pub fn is_rejected(&self, key: &GroupKey) -> bool {
        self.lock().rejected.contains(key)
    }

    /// Inserts a thumbnail as the most recently used entry, replacing any existing
    /// entry for the key. Evicts least recently used entries until it fits, and
    /// returns the keys evicted.
    ///
    /// An item larger than the whole budget is rejected without evicting anything,
    /// and the key is remembered as rejected.
    pub fn put(
        &self,
        key: GroupKey,
        thumbnail: Thumbnail,
        byte_size: usize,
    ) -> Result<Vec<GroupKey>, PutError> {
        let mut inner = self.lock();

        if let Some(old) = inner.entries.pop(&key) {
            inner.used -= old.byte_size;
        }

        if byte_size > inner.budget {
            inner.rejections += 1;
            let budget = inner.budget;
            tracing::debug!("Rejecting thumbnail for {key}: {byte_size} > {budget} bytes");
            inner.rejected.insert(key);
            return Err(PutError::TooLarge { byte_size, budget });
        }

        let evicted = inner.evict_to_fit(byte_size);
        inner.used += byte_size;
        inner.rejected.remove(&key);
        inner.entries.put(
            key,
            CacheEntry {
                thumbnail,
                byte_size,
                last_access: Instant::now(),
            },
        );
        Ok(evicted)
    }

    /// Evicts least recently used entries until `bytes_needed` more bytes would fit, or
    /// the cache is empty. Returns the keys evicted.
    pub fn evict_to_fit(&self, bytes_needed: usize) -> Vec<GroupKey> {
        self.lock().evict_to_fit(bytes_needed)
    }

    /// Changes the budget, evicting as needed. Returns the keys evicted.
    pub fn set_budget(&self, budget: usize) -> Vec<GroupKey> {
        let mut inner = self.lock();
        inner.budget = budget.max(1);
        inner.evict_to_fit(0)
    }

    /// Drops every entry and forgets rejected keys. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.rejected.clear();
        inner.used = 0;
    }

    /// The key that would be evicted next.
    pub fn least_recently_used(&self) -> Option<GroupKey> {
        self.lock().entries.peek_lru().map(|(key, _)| key.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn used_memory(&self) -> usize {
        self.lock().used
    }

    pub fn budget(&self) -> usize {
        self.lock().budget
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            rejections: inner.rejections,
            entries: inner.entries.len(),
            used_bytes: inner.used,
            budget_bytes: inner.budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn thumbnail(bytes: usize) -> Thumbnail {
        Thumbnail {
            width: 1,
            height: 1,
            edge: 1,
            rgba: vec![0; bytes].into(),
        }
    }

    fn key(s: &str) -> GroupKey {
        GroupKey::new(s)
    }

    fn put(cache: &ThumbnailCache, k: &str, bytes: usize) -> Result<Vec<GroupKey>, PutError> {
        cache.put(key(k), thumbnail(bytes), bytes)
    }

    #[test]
    fn test_budget_of_three_items() {
        let cache = ThumbnailCache::new(300);
        put(&cache, "a", 100).unwrap();
        put(&cache, "b", 100).unwrap();
        put(&cache, "c", 100).unwrap();
        let evicted = put(&cache, "d", 100).unwrap();

        assert_eq!(evicted, vec![key("a")]);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&key("a")));
        assert_eq!(cache.used_memory(), 300);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = ThumbnailCache::new(300);
        put(&cache, "a", 100).unwrap();
        put(&cache, "b", 100).unwrap();
        put(&cache, "c", 100).unwrap();

        assert!(cache.get(&key("a")).is_some());
        assert_eq!(cache.least_recently_used(), Some(key("b")));

        let evicted = put(&cache, "d", 100).unwrap();
        assert_eq!(evicted, vec![key("b")]);
        assert!(cache.contains(&key("a")));
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = ThumbnailCache::new(1000);
        put(&cache, "a", 10).unwrap();
        cache.get(&key("a"));
        cache.get(&key("a"));
        cache.get(&key("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.used_bytes, 10);
    }

    #[test]
    fn test_replacing_a_key_releases_the_old_entry() {
        let cache = ThumbnailCache::new(1000);
        put(&cache, "a", 100).unwrap();
        put(&cache, "b", 100).unwrap();
        put(&cache, "a", 300).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.used_memory(), 400);
        assert_eq!(cache.get(&key("a")).unwrap().byte_size(), 300);
        // Replacing made `a` most recent.
        assert_eq!(cache.least_recently_used(), Some(key("b")));
    }

    #[test]
    fn test_oversized_item_is_rejected() {
        let cache = ThumbnailCache::new(100);
        put(&cache, "a", 50).unwrap();
        assert_eq!(
            put(&cache, "huge", 101),
            Err(PutError::TooLarge {
                byte_size: 101,
                budget: 100
            })
        );
        assert!(cache.is_rejected(&key("huge")));
        assert!(!cache.contains(&key("huge")));
        assert!(cache.contains(&key("a")));
        assert_eq!(cache.stats().rejections, 1);
    }

    #[test]
    fn test_budget_invariant_under_mixed_operations() {
        let cache = ThumbnailCache::new(1000);
        let sizes = [120, 700, 30, 999, 1001, 250, 250, 250, 5, 640, 1000, 1];
        for (i, size) in sizes.iter().enumerate() {
            let _ = put(&cache, &format!("k{}", i % 5), *size);
            assert!(cache.used_memory() <= cache.budget());
            if i % 3 == 0 {
                cache.evict_to_fit(400);
                assert!(cache.used_memory() + 400 <= cache.budget() || cache.is_empty());
            }
        }
    }

    #[test]
    fn test_evict_to_fit_removes_oldest_first() {
        let cache = ThumbnailCache::new(300);
        put(&cache, "a", 100).unwrap();
        put(&cache, "b", 100).unwrap();
        put(&cache, "c", 100).unwrap();
        assert_eq!(cache.evict_to_fit(150), vec![key("a"), key("b")]);
        assert_eq!(cache.evict_to_fit(1000), vec![key("c")]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shrinking_budget_evicts() {
        let cache = ThumbnailCache::new(300);
        put(&cache, "a", 100).unwrap();
        put(&cache, "b", 100).unwrap();
        assert_eq!(cache.set_budget(150), vec![key("a")]);
        assert_eq!(cache.budget(), 150);
    }

    #[test]
    fn test_clear() {
        let cache = ThumbnailCache::new(100);
        put(&cache, "a", 10).unwrap();
        let _ = put(&cache, "big", 1000);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.used_memory(), 0);
        assert!(!cache.is_rejected(&key("big")));
    }

    #[test]
    fn test_concurrent_inserts_and_reads() {
        let cache = Arc::new(ThumbnailCache::new(50 * 64));
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let _ = cache.put(key(&format!("{t}-{i}")), thumbnail(64), 64);
                        cache.get(&key(&format!("{t}-{}", i / 2)));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        assert!(cache.used_memory() <= cache.budget());
        assert_eq!(cache.used_memory(), cache.len() * 64);
    }
}

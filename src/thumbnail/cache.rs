//! Bounded FIFO cache of rendered thumbnails.
//!
//! Eviction follows insertion order only: reading an entry does not refresh
//! it. Inserting an existing key replaces the value and makes that key the
//! newest entry.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use super::raster::Thumbnail;

/// Identity of one cached rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Document fingerprint.
    pub fingerprint: String,
    /// 1-based page number.
    pub page: u32,
    /// Render scale in millionths, so keys stay hashable.
    pub scale_millionths: u32,
}

impl CacheKey {
    /// Build a key from a fingerprint, page and scale.
    pub fn new(fingerprint: impl Into<String>, page: u32, scale: f32) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            page,
            scale_millionths: (scale.max(0.0) * 1_000_000.0).round() as u32,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.fingerprint,
            self.page,
            self.scale_millionths as f64 / 1_000_000.0
        )
    }
}

/// FIFO thumbnail cache with a fixed capacity.
#[derive(Debug)]
pub struct ThumbnailCache {
    capacity: usize,
    entries: HashMap<CacheKey, Arc<Thumbnail>>,
    order: VecDeque<CacheKey>,
}

impl ThumbnailCache {
    /// Create an empty cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a rendering without touching eviction order.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Thumbnail>> {
        self.entries.get(key).cloned()
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a rendering, evicting the oldest entries past capacity.
    pub fn insert(&mut self, key: CacheKey, thumbnail: Arc<Thumbnail>) {
        if self.entries.insert(key.clone(), thumbnail).is_some() {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key);

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            trace!(key = %oldest, "evicting thumbnail");
            self.entries.remove(&oldest);
        }
    }

    /// Remove every entry of one document. Returns how many were removed.
    pub fn purge_fingerprint(&mut self, fingerprint: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| k.fingerprint != fingerprint);
        self.order.retain(|k| k.fingerprint != fingerprint);
        before - self.entries.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Keys from oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thumb(tag: u8) -> Arc<Thumbnail> {
        Arc::new(Thumbnail {
            width: 1,
            height: 1,
            scale: 1.0,
            jpeg: vec![tag],
        })
    }

    fn key(fp: &str, page: u32) -> CacheKey {
        CacheKey::new(fp, page, 1.0)
    }

    #[test]
    fn test_evicts_first_inserted() {
        let mut cache = ThumbnailCache::new(3);
        for page in 1..=3 {
            cache.insert(key("a", page), thumb(page as u8));
        }
        // Reads do not refresh.
        assert!(cache.get(&key("a", 1)).is_some());

        cache.insert(key("a", 4), thumb(4));

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&key("a", 1)));
        assert!(cache.contains(&key("a", 2)));
        assert!(cache.contains(&key("a", 4)));
    }

    #[test]
    fn test_reinsert_replaces_and_becomes_newest() {
        let mut cache = ThumbnailCache::new(2);
        cache.insert(key("a", 1), thumb(1));
        cache.insert(key("a", 2), thumb(2));
        cache.insert(key("a", 1), thumb(9));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("a", 1)).unwrap().jpeg, vec![9]);

        cache.insert(key("a", 3), thumb(3));
        assert!(!cache.contains(&key("a", 2)));
        assert!(cache.contains(&key("a", 1)));
    }

    #[test]
    fn test_purge_is_selective() {
        let mut cache = ThumbnailCache::new(10);
        cache.insert(key("aaaa", 1), thumb(1));
        cache.insert(key("aaaa", 2), thumb(2));
        cache.insert(key("aaaabbbb", 1), thumb(3));
        cache.insert(key("cccc", 1), thumb(4));

        assert_eq!(cache.purge_fingerprint("aaaa"), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&key("aaaabbbb", 1)));
        assert_eq!(cache.keys().count(), 2);
    }

    #[test]
    fn test_scale_is_part_of_key() {
        let mut cache = ThumbnailCache::new(10);
        cache.insert(CacheKey::new("a", 1, 1.0), thumb(1));
        assert!(!cache.contains(&CacheKey::new("a", 1, 1.5)));
        assert_eq!(CacheKey::new("a", 1, 1.5).to_string(), "a-1-1.5");
    }

    #[test]
    fn test_clear() {
        let mut cache = ThumbnailCache::new(2);
        cache.insert(key("a", 1), thumb(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.keys().count(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = ThumbnailCache::new(0);
        cache.insert(key("a", 1), thumb(1));
        cache.insert(key("a", 2), thumb(2));
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key("a", 2)));
    }
}

//! The bounded TTL store.

use crate::key::CacheKey;
use crate::stats::CacheStats;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Slot {
    data: Arc<[u8]>,
    written: Instant,
    /// Write order, breaks ties between equal `written` instants.
    sequence: u64,
}

impl Slot {
    fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.written) > ttl
    }
}

#[derive(Default)]
struct Store {
    slots: HashMap<CacheKey, Slot>,
    sequence: u64,
}

impl Store {
    /// The key written longest ago.
    fn oldest(&self) -> Option<CacheKey> {
        self.slots
            .iter()
            .min_by_key(|(_, slot)| (slot.written, slot.sequence))
            .map(|(key, _)| *key)
    }
}

/// Concurrent, size-bounded cache of extracted pages with a time-to-live.
///
/// # Eviction
/// Entries carry the time they were *written*, never the time they were last
/// read. When the cache is full, a new key evicts the entry written longest
/// ago, even if that entry is read constantly. Reads never extend an entry's
/// life either: an entry expires `ttl` after its last [`set`](Self::set).
///
/// # Locking
/// One [`RwLock`] guards the map. Reads of fresh entries share the lock;
/// writes, sweeps and the removal of a stale entry found by a read take it
/// exclusively. The capacity check, eviction and insertion of a `set` happen
/// inside one exclusive section.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
/// use std::time::Duration;
/// use tankobon_cache::{CacheKey, ImageCache};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = ImageCache::new(NonZeroUsize::new(500).unwrap(), Duration::from_secs(3600));
/// let key = CacheKey::new("/manga/vol1.cbz", "p001.jpg");
/// cache.set(key, b"jpeg bytes".to_vec()).await;
/// assert_eq!(cache.get(&key).await.as_deref(), Some(&b"jpeg bytes"[..]));
/// # }
/// ```
pub struct ImageCache {
    store: RwLock<Store>,
    max_size: NonZeroUsize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ImageCache {
    pub fn new(max_size: NonZeroUsize, ttl: Duration) -> Self {
        tracing::debug!(max_size = max_size.get(), ttl = ?ttl, "Image cache initialized");
        Self {
            store: RwLock::new(Store::default()),
            max_size,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn max_size(&self) -> NonZeroUsize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up an entry.
    ///
    /// Returns `None` for absent keys and for entries older than the TTL;
    /// the latter are removed before this returns.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<[u8]>> {
        {
            let store = self.store.read().await;
            match store.slots.get(key) {
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                },
                Some(slot) if !slot.is_stale(Instant::now(), self.ttl) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(Arc::clone(&slot.data));
                },
                Some(_) => {},
            }
        }
        // The entry may have been rewritten between dropping the read lock
        // and taking the write lock; only remove it if it is still stale.
        let mut store = self.store.write().await;
        if let Some(slot) = store.slots.get(key)
            && slot.is_stale(Instant::now(), self.ttl)
        {
            store.slots.remove(key);
            tracing::trace!(%key, "Evicted expired entry on read");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Whether a fresh entry exists for the key.
    ///
    /// Unlike [`get`](Self::get) this neither removes stale entries nor
    /// counts towards the hit/miss statistics.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        let store = self.store.read().await;
        store.slots.get(key).is_some_and(|slot| !slot.is_stale(Instant::now(), self.ttl))
    }

    /// Store an entry, stamping it with the current time.
    ///
    /// Overwriting an existing key never evicts anything. Storing a new key
    /// into a full cache evicts exactly one entry first: the one written
    /// longest ago (earliest write wins ties).
    pub async fn set(&self, key: CacheKey, data: impl Into<Arc<[u8]>>) {
        let data = data.into();
        let mut store = self.store.write().await;
        if !store.slots.contains_key(&key)
            && store.slots.len() >= self.max_size.get()
            && let Some(victim) = store.oldest()
        {
            store.slots.remove(&victim);
            tracing::trace!(key = %victim, "Evicted oldest entry to make room");
        }
        store.sequence += 1;
        let slot = Slot {
            data,
            written: Instant::now(),
            sequence: store.sequence,
        };
        store.slots.insert(key, slot);
    }

    /// Remove every entry older than the TTL, returning how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut store = self.store.write().await;
        let now = Instant::now();
        let before = store.slots.len();
        store.slots.retain(|_, slot| !slot.is_stale(now, self.ttl));
        before - store.slots.len()
    }

    /// Number of entries currently stored, stale or not.
    pub async fn len(&self) -> usize {
        self.store.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.slots.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        let now = Instant::now();
        CacheStats {
            entries: store.slots.len(),
            max_size: self.max_size.get(),
            total_bytes: store.slots.values().map(|slot| slot.data.len() as u64).sum(),
            expired_entries: store.slots.values().filter(|slot| slot.is_stale(now, self.ttl)).count(),
            ttl: self.ttl,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tokio::time::advance;

    const TTL: Duration = Duration::from_secs(60);

    fn cache(max_size: usize) -> ImageCache {
        ImageCache::new(NonZeroUsize::new(max_size).unwrap(), TTL)
    }

    fn key(n: usize) -> CacheKey {
        CacheKey::new("vol1.cbz", &format!("p{n:03}.jpg"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_missing() {
        let cache = cache(4);
        assert!(cache.get(&key(1)).await.is_none());
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get() {
        let cache = cache(4);
        cache.set(key(1), b"one".to_vec()).await;
        let data = cache.get(&key(1)).await.unwrap();
        assert_eq!(&*data, b"one");
        // Same allocation handed out to every reader.
        assert!(Arc::ptr_eq(&data, &cache.get(&key(1)).await.unwrap()));
        assert_eq!(cache.stats().await.hits, 2);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(10)]
    #[tokio::test(start_paused = true)]
    async fn test_capacity_never_exceeded(#[case] max_size: usize) {
        let cache = cache(max_size);
        for n in 0..(max_size * 3) {
            cache.set(key(n), vec![0; n]).await;
            assert!(cache.len().await <= max_size);
            advance(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.len().await, max_size);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicts_oldest_write_not_least_recently_read() {
        let cache = cache(3);
        for n in 1..=3 {
            cache.set(key(n), vec![n as u8]).await;
            advance(Duration::from_secs(1)).await;
        }
        // Reading the oldest entry does not protect it.
        assert!(cache.get(&key(1)).await.is_some());
        cache.set(key(4), vec![4]).await;
        assert!(!cache.contains(&key(1)).await);
        for n in 2..=4 {
            assert!(cache.contains(&key(n)).await, "key {n} should survive");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_tie_break_is_first_written() {
        // Paused clock: every write happens at the same instant.
        let cache = cache(2);
        cache.set(key(1), vec![1]).await;
        cache.set(key(2), vec![2]).await;
        cache.set(key(3), vec![3]).await;
        assert!(!cache.contains(&key(1)).await);
        assert!(cache.contains(&key(2)).await);
        assert!(cache.contains(&key(3)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_does_not_evict() {
        let cache = cache(2);
        cache.set(key(1), vec![1]).await;
        cache.set(key(2), vec![2]).await;
        cache.set(key(1), vec![9, 9]).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(&*cache.get(&key(1)).await.unwrap(), &[9, 9]);
        assert!(cache.contains(&key(2)).await);
        // The rewrite refreshed key 1, so key 2 is now the oldest.
        cache.set(key(3), vec![3]).await;
        assert!(!cache.contains(&key(2)).await);
        assert!(cache.contains(&key(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_on_read() {
        let cache = cache(4);
        cache.set(key(1), vec![1]).await;
        advance(TTL).await;
        // Exactly at the TTL the entry is still valid.
        assert!(cache.get(&key(1)).await.is_some());
        advance(Duration::from_millis(1)).await;
        assert!(cache.get(&key(1)).await.is_none());
        assert!(cache.is_empty().await, "stale entry should be removed by the read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_contains_leaves_stale_entries() {
        let cache = cache(4);
        cache.set(key(1), vec![1]).await;
        advance(TTL + Duration::from_secs(1)).await;
        assert!(!cache.contains(&key(1)).await);
        assert_eq!(cache.len().await, 1);
        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_resets_ttl() {
        let cache = cache(4);
        cache.set(key(1), vec![1]).await;
        advance(Duration::from_secs(45)).await;
        cache.set(key(1), vec![1]).await;
        advance(Duration::from_secs(45)).await;
        assert!(cache.get(&key(1)).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_stale() {
        let cache = cache(10);
        cache.set(key(1), vec![1]).await;
        cache.set(key(2), vec![2]).await;
        advance(Duration::from_secs(40)).await;
        cache.set(key(3), vec![3]).await;
        advance(Duration::from_secs(40)).await;
        assert_eq!(cache.stats().await.expired_entries, 2);
        assert_eq!(cache.sweep().await, 2);
        assert_eq!(cache.len().await, 1);
        assert!(cache.contains(&key(3)).await);
        assert_eq!(cache.sweep().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats() {
        let cache = cache(8);
        cache.set(key(1), vec![0; 100]).await;
        cache.set(key(2), vec![0; 28]).await;
        let _ = cache.get(&key(1)).await;
        let _ = cache.get(&key(3)).await;
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.max_size, 8);
        assert_eq!(stats.total_bytes, 128);
        assert_eq!(stats.expired_entries, 0);
        assert_eq!(stats.ttl, TTL);
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_respect_capacity() {
        let cache = Arc::new(cache(16));
        let tasks: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    for n in 0..100 {
                        cache.set(key(worker * 1000 + n), vec![0; 8]).await;
                        let _ = cache.get(&key(worker * 1000 + n)).await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(cache.len().await, 16);
    }
}

//! In-memory result cache with TTL and LRU eviction.
//!
//! Expired entries are dropped lazily on access or by [`ResultCache::purge_expired`].
//! Size is bounded both by entry count and by the serialized size of results.

use crate::domain::{AnalysisResult, Fingerprint};
use crate::ports::CachePort;
use lru::LruCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_ENTRIES: usize = 100;
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: AnalysisResult,
    inserted_at: Instant,
    fingerprint: Fingerprint,
    size_bytes: usize,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= ttl
    }
}

/// Cache limits.
#[derive(Debug, Clone, Copy)]
pub struct CacheLimits {
    pub ttl: Duration,
    pub max_entries: usize,
    pub max_bytes: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Store {
    entries: LruCache<Fingerprint, CacheEntry>,
    bytes: usize,
}

impl Store {
    fn remove(&mut self, fingerprint: &Fingerprint) {
        if let Some(entry) = self.entries.pop(fingerprint) {
            self.bytes = self.bytes.saturating_sub(entry.size_bytes);
        }
    }
}

pub struct ResultCache {
    store: RwLock<Store>,
    limits: CacheLimits,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(limits: CacheLimits) -> Self {
        Self {
            // Bounds are enforced by hand so the byte budget and the count
            // budget share one eviction path.
            store: RwLock::new(Store {
                entries: LruCache::unbounded(),
                bytes: 0,
            }),
            limits,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.write().await;
        let expired: Vec<Fingerprint> = store
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(self.limits.ttl, now))
            .map(|(k, _)| *k)
            .collect();
        for key in &expired {
            store.remove(key);
        }
        drop(store);

        if !expired.is_empty() {
            debug!(removed = expired.len(), "purged expired cache entries");
        }
        expired.len()
    }

    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        CacheStats {
            entries: store.entries.len(),
            bytes: store.bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheLimits::default())
    }
}

fn estimate_size(result: &AnalysisResult) -> usize {
    serde_json::to_vec(result).map(|v| v.len()).unwrap_or(0)
}

#[async_trait::async_trait]
impl CachePort for ResultCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Option<AnalysisResult> {
        let now = Instant::now();
        // LruCache::get updates recency, so even reads need the write lock.
        let mut store = self.store.write().await;

        let lookup = store
            .entries
            .get(fingerprint)
            .map(|entry| (!entry.is_expired(self.limits.ttl, now)).then(|| entry.result.clone()));

        match lookup {
            Some(Some(result)) => {
                drop(store);
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint = %fingerprint, "cache hit");
                return Some(result);
            }
            Some(None) => {
                store.remove(fingerprint);
                debug!(fingerprint = %fingerprint, "cache entry expired");
            }
            None => {}
        }
        drop(store);

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn put(&self, fingerprint: Fingerprint, result: AnalysisResult) {
        let size_bytes = estimate_size(&result);
        if size_bytes > self.limits.max_bytes || self.limits.max_entries == 0 {
            debug!(fingerprint = %fingerprint, size_bytes, "result too large to cache");
            return;
        }

        let entry = CacheEntry {
            result,
            inserted_at: Instant::now(),
            fingerprint,
            size_bytes,
        };

        let mut store = self.store.write().await;
        store.remove(&fingerprint);
        store.bytes += entry.size_bytes;
        store.entries.put(entry.fingerprint, entry);

        let mut evicted = 0usize;
        while store.entries.len() > self.limits.max_entries || store.bytes > self.limits.max_bytes
        {
            match store.entries.pop_lru() {
                Some((_, old)) => {
                    store.bytes = store.bytes.saturating_sub(old.size_bytes);
                    evicted += 1;
                }
                None => break,
            }
        }
        let entries = store.entries.len();
        drop(store);

        debug!(fingerprint = %fingerprint, size_bytes, entries, evicted, "cached analysis result");
    }
}

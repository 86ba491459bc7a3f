//! Prediction cache
//!
//! Serialized predictions keyed by donor id, each with an ETag and a TTL.
//! A donation reorders the leaderboard, so it clears the cache and bumps a
//! generation counter; a result computed under an older generation is
//! handed back to its caller but never stored.

use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Prediction cache limits
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// Zero disables caching
    pub ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// One donor's serialized prediction
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Vec<u8>,
    pub etag: String,
    pub stored_at: Instant,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        let stored_at = Instant::now();
        Self {
            etag: compute_etag(&data),
            data,
            stored_at,
            expires_at: stored_at + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }

    /// Whole seconds left before expiry, for `Cache-Control: max-age`
    pub fn remaining_ttl_secs(&self) -> u64 {
        self.expires_at
            .saturating_duration_since(Instant::now())
            .as_secs()
    }
}

/// Quoted ETag from the first 16 bytes of the SHA256 of `data`
pub fn compute_etag(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("\"{}\"", hex::encode(&digest[..16]))
}

/// Counters reported by the health endpoint
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hits as a percentage of lookups, 0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 * 100.0 / lookups as f64,
        }
    }
}

/// Per-donor prediction cache shared by request handlers
pub struct PredictionCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PredictionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Current generation. Read it before computing a value to cache.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Fresh entry for `donor_id`. Expired entries are dropped on the way.
    pub fn get(&self, donor_id: &str) -> Option<CacheEntry> {
        let fresh = match self.entries.get(donor_id) {
            Some(entry) if !entry.is_expired() => Some(entry.clone()),
            _ => None,
        };

        match fresh {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(donor_id, "Prediction cache hit");
                Some(entry)
            }
            None => {
                self.entries.remove_if(donor_id, |_, entry| entry.is_expired());
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(donor_id, "Prediction cache miss");
                None
            }
        }
    }

    /// Store a prediction computed at `generation` and return its entry.
    ///
    /// The entry is still returned but not stored when an invalidation
    /// happened since `generation` was read.
    pub fn set(&self, donor_id: &str, data: Vec<u8>, generation: u64) -> CacheEntry {
        let entry = CacheEntry::new(data, self.config.ttl);
        if self.config.ttl.is_zero() || generation != self.generation() {
            debug!(donor_id, "Prediction not cached (stale or caching disabled)");
            return entry;
        }

        self.entries.insert(donor_id.to_string(), entry.clone());
        // An invalidation may have raced the insert
        if generation != self.generation() {
            self.entries.remove(donor_id);
            return entry;
        }
        self.evict_overflow();
        entry
    }

    /// Drop every entry and bump the generation. Returns how many were dropped.
    pub fn invalidate_all(&self) -> usize {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let dropped = self.entries.len();
        self.entries.clear();
        if dropped > 0 {
            debug!(dropped, "Invalidated cached predictions");
        }
        dropped
    }

    /// Drop expired entries. Returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Drop the oldest entries until the cache fits `max_entries`
    fn evict_overflow(&self) {
        let overflow = self.entries.len().saturating_sub(self.config.max_entries);
        if overflow == 0 {
            return;
        }

        let mut by_age: Vec<(Instant, String)> = self
            .entries
            .iter()
            .map(|item| (item.stored_at, item.key().clone()))
            .collect();
        by_age.sort_unstable();

        for (_, donor_id) in by_age.into_iter().take(overflow) {
            if self.entries.remove(&donor_id).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        debug!(overflow, "Evicted oldest predictions");
    }
}

/// Periodically drop expired predictions
pub fn spawn_cleanup_task(cache: Arc<PredictionCache>) {
    let period = cache.config.cleanup_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let dropped = cache.cleanup();
            if dropped > 0 {
                debug!(dropped, entries = cache.stats().entries, "Expired predictions dropped");
            }
        }
    });
    info!(interval_secs = period.as_secs(), "Prediction cache cleanup task started");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_is_stable() {
        let a = CacheEntry::new(b"{\"x\":1}".to_vec(), Duration::from_secs(60));
        let b = CacheEntry::new(b"{\"x\":1}".to_vec(), Duration::from_secs(60));
        let c = CacheEntry::new(b"{\"x\":2}".to_vec(), Duration::from_secs(60));
        assert_eq!(a.etag, b.etag);
        assert_ne!(a.etag, c.etag);
        // quotes + 32 hex chars
        assert_eq!(a.etag.len(), 34);
    }

    #[test]
    fn test_get_set_counts() {
        let cache = PredictionCache::new(CacheConfig::default());
        assert!(cache.get("alice").is_none());

        let gen = cache.generation();
        cache.set("alice", b"prediction".to_vec(), gen);
        let entry = cache.get("alice").expect("Should have entry");
        assert_eq!(entry.data, b"prediction");

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_expiry() {
        let cache = PredictionCache::new(CacheConfig {
            ttl: Duration::from_millis(10),
            ..CacheConfig::default()
        });
        cache.set("alice", b"soon gone".to_vec(), cache.generation());
        assert!(cache.get("alice").is_some());

        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("alice").is_none());
    }

    #[test]
    fn test_stale_generation_is_not_stored() {
        let cache = PredictionCache::new(CacheConfig::default());
        let gen = cache.generation();
        cache.invalidate_all();
        let entry = cache.set("alice", b"old".to_vec(), gen);
        assert_eq!(entry.data, b"old");
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_invalidate_all() {
        let cache = PredictionCache::new(CacheConfig::default());
        let gen = cache.generation();
        cache.set("a", b"1".to_vec(), gen);
        cache.set("b", b"2".to_vec(), gen);
        assert_eq!(cache.invalidate_all(), 2);
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.generation(), gen + 1);
    }

    #[test]
    fn test_eviction_removes_oldest() {
        let cache = PredictionCache::new(CacheConfig {
            max_entries: 2,
            ..CacheConfig::default()
        });
        let gen = cache.generation();
        cache.set("first", b"1".to_vec(), gen);
        std::thread::sleep(Duration::from_millis(2));
        cache.set("second", b"2".to_vec(), gen);
        std::thread::sleep(Duration::from_millis(2));
        cache.set("third", b"3".to_vec(), gen);

        assert_eq!(cache.stats().entries, 2);
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn test_cleanup_removes_expired() {
        let cache = PredictionCache::new(CacheConfig {
            ttl: Duration::from_millis(5),
            ..CacheConfig::default()
        });
        cache.set("a", b"1".to_vec(), cache.generation());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_zero_ttl_disables_storage() {
        let cache = PredictionCache::new(CacheConfig {
            ttl: Duration::ZERO,
            ..CacheConfig::default()
        });
        cache.set("alice", b"x".to_vec(), cache.generation());
        assert_eq!(cache.stats().entries, 0);
    }
}

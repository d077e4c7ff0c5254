//! Cache — a bounded, TTL-bearing map from a deterministic fingerprint to a
//! cached response.
//!
//! Generalizes the simple `Cache<T>` pattern seen across the examples pack
//! (TTL hashmap guarded by a reader/writer lock) with the eviction and
//! recency-aware TTL rules spec.md §4.C mandates: earliest-expiry eviction
//! rather than LRU, and a TTL chosen from the request's recency class.
//!
//! All public operations are safe under parallel threads; `parking_lot`'s
//! `RwLock` (the teacher's lock of choice, see `database/tick_queue.rs`)
//! keeps write-side critical sections short.

use crate::catalog::Resolution;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Recency-based TTL class from spec.md §4.C, keyed off the request's `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    Recent,
    Today,
    Historical,
}

impl TtlClass {
    /// Classify a request by how far its `end` sits from `now`.
    pub fn classify(end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let age = now - end;
        if age <= chrono::Duration::hours(1) {
            TtlClass::Recent
        } else if age <= chrono::Duration::hours(24) {
            TtlClass::Today
        } else {
            TtlClass::Historical
        }
    }

    /// Resolve this class's TTL against the configured policy.
    pub fn ttl(&self, policy: &CacheTtlPolicy) -> Duration {
        match self {
            TtlClass::Recent => policy.recent,
            TtlClass::Today => policy.today,
            TtlClass::Historical => policy.historical,
        }
    }
}

/// Per-class TTLs, populated from `cache.recent_ttl` / `cache.ttl` /
/// `cache.historical_ttl` configuration (see `CacheConfig::ttl_policy`).
#[derive(Debug, Clone, Copy)]
pub struct CacheTtlPolicy {
    pub recent: Duration,
    pub today: Duration,
    pub historical: Duration,
}

impl Default for CacheTtlPolicy {
    fn default() -> Self {
        Self {
            recent: Duration::from_secs(10),
            today: Duration::from_secs(60),
            historical: Duration::from_secs(300),
        }
    }
}

/// Deterministic fingerprint of `(symbol, resolution, start, end)`.
///
/// A pure function of its inputs — two calls with identical arguments
/// always produce the same key, satisfying spec.md property 7.
pub fn fingerprint(symbol: &str, resolution: Resolution, start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    symbol.hash(&mut hasher);
    resolution.as_str().hash(&mut hasher);
    start.timestamp().hash(&mut hasher);
    end.timestamp().hash(&mut hasher);
    hasher.finish()
}

struct Entry<T> {
    payload: T,
    expires_at: Instant,
    size_hint: usize,
}

/// Lifetime hit/miss/eviction counters for `/stats/cache`.
#[derive(Debug, Clone, Copy, serde::Serialize, utoipa::ToSchema)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Size-bounded, TTL-bearing cache. Not LRU: on overflow the entry with the
/// smallest `expires_at` is evicted, since every payload is immutable and
/// most are short-lived, making expiry a better predictor than recency.
pub struct Cache<T: Clone> {
    entries: RwLock<HashMap<u64, Entry<T>>>,
    max_size: usize,
    counters: Counters,
}

impl<T: Clone> Cache<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_size,
            counters: Counters {
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            },
        }
    }

    /// Fetch a payload if present and unexpired. An expired entry is treated
    /// as absent and counted as a miss (it is removed lazily by `sweep`,
    /// not here, to keep `get` a read-lock-only path).
    pub fn get(&self, key: u64) -> Option<T> {
        let entries = self.entries.read();
        match entries.get(&key) {
            Some(entry) if Instant::now() <= entry.expires_at => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.payload.clone())
            }
            _ => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace a payload with the given TTL. Best-effort: never
    /// fails, since a cache write failure must not break the read path.
    pub fn set(&self, key: u64, payload: T, ttl: Duration, size_hint: usize) {
        let expires_at = Instant::now() + ttl;
        let mut entries = self.entries.write();

        if entries.len() >= self.max_size && !entries.contains_key(&key) {
            self.evict_earliest_expiring(&mut entries);
        }

        entries.insert(
            key,
            Entry {
                payload,
                expires_at,
                size_hint,
            },
        );
    }

    /// Evict the entry with the smallest `expires_at`; ties broken by the
    /// smaller key, so the choice is deterministic under concurrent inserts.
    fn evict_earliest_expiring(&self, entries: &mut HashMap<u64, Entry<T>>) {
        let victim = entries
            .iter()
            .min_by_key(|(key, entry)| (entry.expires_at, **key))
            .map(|(key, _)| *key);

        if let Some(key) = victim {
            entries.remove(&key);
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn delete(&self, key: u64) {
        self.entries.write().remove(&key);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop every currently-expired entry. Intended to run on the ~60s
    /// reaper tick, not on the request path.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            size: self.entries.read().len(),
        }
    }
}

/// Spawn the ~60s reaper task that drops expired entries.
pub fn spawn_reaper<T: Clone + Send + Sync + 'static>(
    cache: std::sync::Arc<Cache<T>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let dropped = cache.sweep();
            if dropped > 0 {
                tracing::debug!(dropped, "cache reaper swept expired entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_pure() {
        let start = Utc::now();
        let end = start + chrono::Duration::hours(1);
        let a = fingerprint("EURUSD", Resolution::OneHour, start, end);
        let b = fingerprint("EURUSD", Resolution::OneHour, start, end);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_distinguishes_inputs() {
        let start = Utc::now();
        let end = start + chrono::Duration::hours(1);
        let a = fingerprint("EURUSD", Resolution::OneHour, start, end);
        let b = fingerprint("GBPUSD", Resolution::OneHour, start, end);
        assert_ne!(a, b);
    }

    #[test]
    fn hit_then_miss_after_ttl() {
        let cache: Cache<u32> = Cache::new(10);
        cache.set(1, 42, Duration::from_millis(20), 4);
        assert_eq!(cache.get(1), Some(42));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(1), None);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn size_bound_holds_via_earliest_expiry_eviction() {
        let cache: Cache<u32> = Cache::new(2);
        cache.set(1, 1, Duration::from_secs(1), 1);
        cache.set(2, 2, Duration::from_secs(10), 1);
        // 1 expires sooner, so inserting a third entry evicts it.
        cache.set(3, 3, Duration::from_secs(10), 1);

        assert_eq!(cache.stats().size, 2);
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(2), Some(2));
        assert_eq!(cache.get(3), Some(3));
    }

    #[test]
    fn sweep_removes_only_expired() {
        let cache: Cache<u32> = Cache::new(10);
        cache.set(1, 1, Duration::from_millis(10), 1);
        cache.set(2, 2, Duration::from_secs(10), 1);
        std::thread::sleep(Duration::from_millis(30));
        let dropped = cache.sweep();
        assert_eq!(dropped, 1);
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn ttl_class_by_recency() {
        let now = Utc::now();
        assert_eq!(TtlClass::classify(now - chrono::Duration::minutes(1), now), TtlClass::Recent);
        assert_eq!(TtlClass::classify(now - chrono::Duration::hours(5), now), TtlClass::Today);
        assert_eq!(
            TtlClass::classify(now - chrono::Duration::days(3), now),
            TtlClass::Historical
        );
    }

    #[test]
    fn ttl_class_resolves_against_the_configured_policy() {
        let policy = CacheTtlPolicy {
            recent: Duration::from_secs(1),
            today: Duration::from_secs(2),
            historical: Duration::from_secs(3),
        };
        assert_eq!(TtlClass::Recent.ttl(&policy), Duration::from_secs(1));
        assert_eq!(TtlClass::Today.ttl(&policy), Duration::from_secs(2));
        assert_eq!(TtlClass::Historical.ttl(&policy), Duration::from_secs(3));
    }
}

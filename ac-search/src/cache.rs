//! In-memory TTL cache with an injectable clock.
//!
//! Each collector (and the research service) owns its own [`TtlCache`]
//! instead of sharing module-level state. Entries carry an absolute expiry
//! computed from a [`Clock`], so tests can advance time deterministically
//! with [`ManualClock`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Default maximum number of entries per cache.
const DEFAULT_CAPACITY: usize = 256;

/// Longest TTL accepted, to keep expiry arithmetic in range.
const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `seconds`.
    pub fn advance_secs(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += Duration::seconds(seconds);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// A bounded `key -> (value, expiry)` map.
///
/// Expired entries are never returned by [`TtlCache::get`] but stay in place
/// until [`TtlCache::evict_expired`] runs, an insert needs the room, or
/// [`TtlCache::remove`] drops them. [`TtlCache::get_stale`] can still read
/// them, which lets a collector fall back to old data when its upstream
/// quota is exhausted.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache whose entries live for `ttl_seconds`.
    pub fn new(ttl_seconds: u64, clock: Arc<dyn Clock>) -> Self {
        Self::with_capacity(ttl_seconds, DEFAULT_CAPACITY, clock)
    }

    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(ttl_seconds: u64, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: ttl_duration(ttl_seconds),
            capacity: capacity.max(1),
            clock,
        }
    }

    /// Look up a fresh value. Expired entries read as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| now <= entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Look up a value regardless of expiry.
    pub fn get_stale(&self, key: &K) -> Option<V> {
        self.lock().get(key).map(|entry| entry.value.clone())
    }

    /// Insert with the cache's default TTL, replacing any previous value.
    pub fn insert(&self, key: K, value: V) {
        let ttl = self.ttl;
        self.insert_for(key, value, ttl);
    }

    /// Insert with an explicit TTL.
    pub fn insert_with_ttl(&self, key: K, value: V, ttl_seconds: u64) {
        self.insert_for(key, value, ttl_duration(ttl_seconds));
    }

    /// Remove an entry, returning its value if present.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().remove(key).map(|entry| entry.value)
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.expires_at);
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn insert_for(&self, key: K, value: V, ttl: Duration) {
        let now = self.clock.now();
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            entries.retain(|_, entry| now <= entry.expires_at);
            if entries.len() >= self.capacity {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(k) = soonest {
                    entries.remove(&k);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl_seconds", &self.ttl.num_seconds())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

fn ttl_duration(ttl_seconds: u64) -> Duration {
    let secs = ttl_seconds.min(MAX_TTL_SECONDS);
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid date")
    }

    fn cache(ttl: u64) -> (Arc<ManualClock>, TtlCache<String, Vec<u32>>) {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TtlCache::new(ttl, clock.clone());
        (clock, cache)
    }

    #[test]
    fn miss_returns_none() {
        let (_, cache) = cache(600);
        assert!(cache.get(&"nothing".to_string()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_and_retrieve() {
        let (_, cache) = cache(600);
        cache.insert("k".into(), vec![1, 2, 3]);
        assert_eq!(cache.get(&"k".to_string()), Some(vec![1, 2, 3]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (clock, cache) = cache(600);
        cache.insert("k".into(), vec![1]);

        clock.advance_secs(600);
        assert!(cache.get(&"k".to_string()).is_some(), "still valid at the boundary");

        clock.advance_secs(1);
        assert!(cache.get(&"k".to_string()).is_none());
    }

    #[test]
    fn stale_read_survives_expiry() {
        let (clock, cache) = cache(10);
        cache.insert("k".into(), vec![7]);
        clock.advance_secs(3600);
        assert!(cache.get(&"k".to_string()).is_none());
        assert_eq!(cache.get_stale(&"k".to_string()), Some(vec![7]));
    }

    #[test]
    fn evict_expired_drops_only_old_entries() {
        let (clock, cache) = cache(60);
        cache.insert("old".into(), vec![1]);
        clock.advance_secs(30);
        cache.insert_with_ttl("new".into(), vec![2], 600);
        clock.advance_secs(31);

        assert_eq!(cache.evict_expired(), 1);
        assert!(cache.get_stale(&"old".to_string()).is_none());
        assert_eq!(cache.get(&"new".to_string()), Some(vec![2]));
    }

    #[test]
    fn overwrite_same_key_updates_value_and_expiry() {
        let (clock, cache) = cache(60);
        cache.insert("k".into(), vec![1]);
        clock.advance_secs(50);
        cache.insert("k".into(), vec![2]);
        clock.advance_secs(50);
        assert_eq!(cache.get(&"k".to_string()), Some(vec![2]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_returns_value() {
        let (_, cache) = cache(60);
        cache.insert("k".into(), vec![9]);
        assert_eq!(cache.remove(&"k".to_string()), Some(vec![9]));
        assert!(cache.remove(&"k".to_string()).is_none());
    }

    #[test]
    fn capacity_evicts_soonest_expiring_entry() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache: TtlCache<&str, u8> = TtlCache::with_capacity(600, 2, clock);
        cache.insert_with_ttl("short", 1, 10);
        cache.insert_with_ttl("long", 2, 1000);
        cache.insert("third", 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&"short").is_none());
        assert_eq!(cache.get(&"long"), Some(2));
        assert_eq!(cache.get(&"third"), Some(3));
    }

    #[test]
    fn capacity_prefers_evicting_expired_entries() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache: TtlCache<&str, u8> = TtlCache::with_capacity(600, 2, clock.clone());
        cache.insert_with_ttl("a", 1, 5);
        cache.insert_with_ttl("b", 2, 5);
        clock.advance_secs(10);
        cache.insert("c", 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn huge_ttl_is_clamped() {
        let (_, cache) = cache(u64::MAX);
        cache.insert("k".into(), vec![1]);
        assert!(cache.get(&"k".to_string()).is_some());
    }

    #[test]
    fn manual_clock_set() {
        let clock = ManualClock::new(start());
        let later = start() + Duration::days(3);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn cache_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TtlCache<String, Vec<String>>>();
    }
}

//! Bounded cache of water-area results.
//!
//! Keys are normalized (date range plus coordinates quantized to
//! [`COORD_QUANTUM_DEG`]) so that boxes differing only by float noise share an
//! entry. Entries are evicted least-recently-used once the cache is full, and
//! optionally expire after a fixed time-to-live.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use waterbox_geo::{BoundingBox, DateRange};

/// Coordinate rounding step used for cache keys (about 0.1 m).
pub const COORD_QUANTUM_DEG: f64 = 1e-6;

/// Normalized lookup key for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    range: DateRange,
    coords: [i64; 4],
}

impl CacheKey {
    /// Key for a date range and box.
    pub fn new(range: &DateRange, bbox: &BoundingBox) -> Self {
        Self {
            range: *range,
            coords: bbox.quantized(COORD_QUANTUM_DEG),
        }
    }
}

/// Hit/miss counters for the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing (or an expired entry).
    pub misses: u64,
    /// Entries currently held.
    pub entries: usize,
}

struct Entry {
    square_meters: f64,
    stored_at: Instant,
}

/// LRU state (most recently used at the back of `access_order`).
struct LruState {
    entries: HashMap<CacheKey, Entry>,
    access_order: Vec<CacheKey>,
}

impl LruState {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
            self.access_order.push(*key);
        }
    }

    fn remove(&mut self, key: &CacheKey) {
        self.entries.remove(key);
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
    }
}

/// Bounded LRU cache of raw water areas in m².
pub struct QueryCache {
    state: Mutex<LruState>,
    capacity: usize,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

impl QueryCache {
    /// Cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LruState {
                entries: HashMap::new(),
                access_order: Vec::new(),
            }),
            capacity: capacity.max(1),
            ttl: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Expire entries `ttl` after they were stored.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a cached area.
    pub fn get(&self, key: &CacheKey) -> Option<f64> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<f64> {
        let mut state = self.state.lock();

        let lookup = state.entries.get(key).map(|entry| {
            let expired = self
                .ttl
                .is_some_and(|ttl| now.duration_since(entry.stored_at) >= ttl);
            (entry.square_meters, expired)
        });

        match lookup {
            Some((value, false)) => {
                state.touch(key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some((_, true)) => {
                state.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store an area, evicting the least recently used entry when full.
    pub fn insert(&self, key: CacheKey, square_meters: f64) {
        self.insert_at(key, square_meters, Instant::now());
    }

    fn insert_at(&self, key: CacheKey, square_meters: f64, now: Instant) {
        let mut state = self.state.lock();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.square_meters = square_meters;
            entry.stored_at = now;
            state.touch(&key);
            return;
        }

        while state.entries.len() >= self.capacity && !state.access_order.is_empty() {
            let oldest = state.access_order.remove(0);
            state.entries.remove(&oldest);
        }

        state.entries.insert(
            key,
            Entry {
                square_meters,
                stored_at: now,
            },
        );
        state.access_order.push(key);
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

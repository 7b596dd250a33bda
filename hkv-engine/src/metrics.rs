//! # Cache Metrics
//!
//! Purpose: Provide monotonic counters for hits, misses, evictions, and
//! expired removals, plus a derived hit-rate view, matching the teacher's
//! accumulator pattern from the server-side request metrics.
//!
//! ## Design Principles
//!
//! 1. **Accumulator Pattern**: Atomic counters aggregate events cheaply
//!    without an extra lock.
//! 2. **Derived, Never Stored**: `hit_rate` is computed from a snapshot,
//!    never itself persisted as mutable state.
//! 3. **Export Is a Value**: `snapshot()` returns an immutable point-in-time
//!    struct, not a view over the live counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of all cache metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    /// Total successful lookups that returned a live value.
    pub hits: u64,
    /// Total lookups that found nothing (absent or expired).
    pub misses: u64,
    /// Total entries evicted to stay within capacity.
    pub evictions: u64,
    /// Total entries removed because their TTL had passed.
    pub expired_removals: u64,
    /// `hits + misses`.
    pub total_requests: u64,
    /// `hits / total_requests`, or `0.0` when there have been no requests.
    pub hit_rate: f64,
    /// Number of entries currently in the store.
    pub current_size: usize,
}

/// Thread-safe counters for cache-level events.
///
/// Every counter mutation happens while the engine's store mutex is held
/// (see `engine.rs`), so a snapshot taken immediately after a mutating call
/// under that same mutex is guaranteed consistent with `current_size`.
/// `Ordering::Relaxed` is sufficient for the individual fields since the
/// mutex, not the atomics, is what provides that consistency.
#[derive(Debug, Default)]
pub struct Metrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired_removals: AtomicU64,
}

impl Metrics {
    /// Creates a fresh, zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cache hit.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cache miss (absent or expired-and-removed key).
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one LRU eviction.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` expired-entry removals (lazy or swept).
    pub fn record_expired_removals(&self, count: u64) {
        if count > 0 {
            self.expired_removals.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Returns a point-in-time snapshot, combined with the caller-supplied
    /// current store size.
    pub fn snapshot(&self, current_size: usize) -> MetricsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total_requests = hits + misses;
        let hit_rate = if total_requests > 0 {
            hits as f64 / total_requests as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            expired_removals: self.expired_removals.load(Ordering::Relaxed),
            total_requests,
            hit_rate,
            current_size,
        }
    }
}

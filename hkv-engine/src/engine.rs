//! # Cache Engine
//!
//! Purpose: Tie the entry store, LRU policy, TTL policy, metrics, and
//! sweeper together under one exclusion discipline, exposing the public
//! `put`/`get`/`delete`/`clear`/`stats`/`all`/`shutdown` contract.
//!
//! ## Design Principles
//!
//! 1. **Single Coarse Lock**: One `parking_lot::Mutex<Store<K, V>>` guards
//!    the recency list and, implicitly, the invariant that ties
//!    `current_size` to the store. Every `get` already couples a lookup to
//!    a move-to-front mutation, so finer-grained locking buys nothing.
//! 2. **No Re-Entrance**: `parking_lot::Mutex` is not re-entrant; the
//!    public API acquires it exactly once per call and delegates to
//!    private `&mut Store` helpers (`put`'s internal eviction never
//!    re-locks).
//! 3. **Strategy-Free Core**: The engine does not know whether it is being
//!    driven over HTTP or by a benchmark harness — see `hkv-server` and
//!    `hkv-bench` for those.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use hkv_common::{HkvError, HkvResult};

use crate::config::EngineConfig;
use crate::key::CacheKey;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::store::Store;
use crate::sweeper::{SweeperHandle, SweeperState};

/// Maximum number of entries the sweeper scans per lock acquisition.
///
/// Keeps each sweep batch bounded so the sweeper never holds the store
/// mutex for an unbounded time on a very large cache, per `spec.md` §4.5.
const SWEEP_BATCH_SIZE: usize = 4096;

/// Thread-safe, bounded-capacity, TTL-aware LRU cache.
///
/// Generic over key type `K` (must implement [`CacheKey`]) and value type
/// `V`; the engine never interprets `V`, it only stores and returns it.
pub struct Cache<K, V> {
    store: Mutex<Store<K, V>>,
    metrics: Metrics,
    config: EngineConfig,
    shut_down: AtomicBool,
    sweeper: Mutex<Option<SweeperHandle>>,
}

/// A `{key, value}` pair as returned by `all()`, in MRU -> LRU order.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Cache<K, V>
where
    K: CacheKey + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    /// Creates a new engine with the given configuration. Does not start
    /// the background sweeper; call [`Cache::start_sweeper`] separately so
    /// callers who don't want a background thread (e.g. unit tests) don't
    /// pay for one.
    pub fn new(config: EngineConfig) -> Self {
        Cache {
            store: Mutex::new(Store::new()),
            metrics: Metrics::new(),
            config,
            shut_down: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        }
    }

    /// Starts the background sweeper thread on the configured interval.
    ///
    /// Requires `self` to be wrapped in an `Arc` since the sweeper thread
    /// holds a cloned reference back into the engine. Calling this more
    /// than once replaces the previous sweeper (the old one is left
    /// running; prefer calling it exactly once per engine).
    pub fn start_sweeper(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let handle = SweeperHandle::spawn(self.config.sweep_interval, move |now| {
            engine.sweep_batch(now)
        });
        *self.sweeper.lock() = Some(handle);
    }

    /// Returns the sweeper's lifecycle state, if one has been started.
    pub fn sweeper_state(&self) -> Option<SweeperState> {
        self.sweeper.lock().as_ref().map(SweeperHandle::state)
    }

    /// Inserts or updates `key` with `value`, applying `ttl` (seconds) or
    /// falling back to the engine's configured `default_ttl`.
    ///
    /// Behavior (spec.md §4.2):
    /// 1. Compute `expires_at` from the effective TTL.
    /// 2. Insert, overwriting in place and promoting to MRU if present.
    /// 3. If capacity is now exceeded, evict exactly one LRU entry.
    pub fn put(&self, key: K, value: V, ttl: Option<Duration>) -> HkvResult<()> {
        self.check_alive()?;
        if key.is_empty_key() {
            return Err(HkvError::InvalidKey);
        }
        if let Some(ttl) = ttl {
            if ttl.is_zero() {
                return Err(HkvError::InvalidTTL);
            }
        }

        let effective_ttl = ttl.or(self.config.default_ttl);
        let now = Instant::now();
        let expires_at = effective_ttl.map(|ttl| now + ttl);

        let mut store = self.store.lock();
        store.insert(key, value, expires_at);

        // Each insert grows size by at most one; one eviction is always
        // sufficient to restore the bound (spec.md §4.2 invariant, not an
        // optimization).
        if store.size() > self.config.max_size {
            if store.pop_lru().is_some() {
                self.metrics.record_eviction();
            }
        }

        Ok(())
    }

    /// Looks up `key`. Expired entries are removed lazily on access.
    ///
    /// Behavior (spec.md §4.3): miss on absent; expire-and-miss when past
    /// deadline; otherwise promote to MRU and return a hit, atomically
    /// with respect to the counter update.
    pub fn get(&self, key: &K) -> HkvResult<Option<V>> {
        self.check_alive()?;
        if key.is_empty_key() {
            return Err(HkvError::InvalidKey);
        }

        let now = Instant::now();
        let mut store = self.store.lock();

        let Some((value, expired)) = store.lookup(key, now) else {
            self.metrics.record_miss();
            return Ok(None);
        };

        if expired {
            store.remove(key);
            self.metrics.record_expired_removals(1);
            self.metrics.record_miss();
            return Ok(None);
        }

        store.touch(key);
        self.metrics.record_hit();
        Ok(Some(value))
    }

    /// Removes `key`. Returns `Ok(())` when removed, `Err(NotFound)` when
    /// absent. Does not affect hit/miss counters (spec.md §4.4).
    pub fn delete(&self, key: &K) -> HkvResult<()> {
        self.check_alive()?;
        let mut store = self.store.lock();
        match store.remove(key) {
            Some(_) => Ok(()),
            None => Err(HkvError::NotFound),
        }
    }

    /// Empties the store. Counters are preserved (spec.md §4.4).
    pub fn clear(&self) -> HkvResult<()> {
        self.check_alive()?;
        self.store.lock().clear();
        Ok(())
    }

    /// Returns a point-in-time metrics snapshot.
    ///
    /// Holds the store guard across both the size read and the counter
    /// snapshot so `current_size` can't be paired with counters from a
    /// mutation that happened in the gap between them (spec.md §4.6, §5).
    pub fn stats(&self) -> HkvResult<MetricsSnapshot> {
        self.check_alive()?;
        let store = self.store.lock();
        Ok(self.metrics.snapshot(store.size()))
    }

    /// Returns a snapshot of all live entries, MRU -> LRU, excluding
    /// entries expired at snapshot time. Does not mutate recency order or
    /// counters (a snapshot read is not a `get`).
    pub fn all(&self) -> HkvResult<Vec<CacheEntry<K, V>>> {
        self.check_alive()?;
        let now = Instant::now();
        let store = self.store.lock();
        Ok(store
            .iterate(now)
            .into_iter()
            .map(|(key, value)| CacheEntry { key, value })
            .collect())
    }

    /// Terminates the engine: stops the sweeper (if running) and marks the
    /// engine terminal. Every subsequent public call returns
    /// `Err(Shutdown)`.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        if let Some(handle) = self.sweeper.lock().take() {
            handle.stop();
        }
    }

    fn check_alive(&self) -> HkvResult<()> {
        if self.shut_down.load(Ordering::Acquire) {
            Err(HkvError::Shutdown)
        } else {
            Ok(())
        }
    }

    /// Removes expired entries in bounded batches, yielding the store
    /// mutex between batches so the sweeper never holds it unboundedly
    /// long on a very large store (spec.md §4.5).
    ///
    /// Termination is tracked by total slots visited against the store's
    /// slot count, not by comparing a batch's scan count to the limit: a
    /// store with no free-list holes always returns a full batch, so
    /// `scanned < SWEEP_BATCH_SIZE` would never fire and the sweeper would
    /// spin inside this call forever, permanently blocking
    /// `SweeperHandle::stop()`.
    fn sweep_batch(&self, now: Instant) -> usize {
        let mut cursor = 0usize;
        let mut total_removed = 0usize;
        let mut visited = 0usize;

        loop {
            let (removed, scanned, slot_count) = {
                let mut store = self.store.lock();
                let slot_count = store.slot_count();
                let (removed, scanned) = store.remove_expired_batch(now, cursor, SWEEP_BATCH_SIZE);
                (removed, scanned, slot_count)
            };
            total_removed += removed;
            cursor = cursor.wrapping_add(scanned);
            visited += scanned;

            if scanned == 0 || visited >= slot_count {
                break;
            }
            std::thread::yield_now();
        }

        if total_removed > 0 {
            self.metrics.record_expired_removals(total_removed as u64);
            tracing::debug!(removed = total_removed, "sweeper reaped expired entries");
        }

        total_removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(max_size: usize) -> Cache<String, i32> {
        Cache::new(EngineConfig::with_max_size(max_size))
    }

    #[test]
    fn put_rejects_empty_key() {
        let cache = engine(10);
        let err = cache.put(String::new(), 1, None).unwrap_err();
        assert_eq!(err, HkvError::InvalidKey);
    }

    #[test]
    fn put_rejects_zero_ttl() {
        let cache = engine(10);
        let err = cache
            .put("a".to_string(), 1, Some(Duration::from_secs(0)))
            .unwrap_err();
        assert_eq!(err, HkvError::InvalidTTL);
    }

    #[test]
    fn scenario_eviction_on_overflow() {
        // spec.md §8 scenario 1: max_size=2, put a,b,c -> a evicted.
        let cache = engine(2);
        cache.put("a".to_string(), 1, None).unwrap();
        cache.put("b".to_string(), 2, None).unwrap();
        cache.put("c".to_string(), 3, None).unwrap();

        assert_eq!(cache.get(&"a".to_string()).unwrap(), None);
        assert_eq!(cache.get(&"b".to_string()).unwrap(), Some(2));
        assert_eq!(cache.get(&"c".to_string()).unwrap(), Some(3));
        assert_eq!(cache.stats().unwrap().evictions, 1);
    }

    #[test]
    fn scenario_promotion_changes_eviction_target() {
        // spec.md §8 scenario 2: max_size=3, put a,b,c; get(a); put(d)
        // -> b is evicted, not a.
        let cache = engine(3);
        cache.put("a".to_string(), 1, None).unwrap();
        cache.put("b".to_string(), 2, None).unwrap();
        cache.put("c".to_string(), 3, None).unwrap();
        cache.get(&"a".to_string()).unwrap();
        cache.put("d".to_string(), 4, None).unwrap();

        assert_eq!(cache.get(&"b".to_string()).unwrap(), None);
        assert_eq!(cache.get(&"a".to_string()).unwrap(), Some(1));
        assert_eq!(cache.get(&"c".to_string()).unwrap(), Some(3));
        assert_eq!(cache.get(&"d".to_string()).unwrap(), Some(4));
    }

    #[test]
    fn scenario_ttl_expiry_on_access() {
        // spec.md §8 scenario 3.
        let cache = engine(10);
        cache
            .put("x".to_string(), 1, Some(Duration::from_millis(50)))
            .unwrap();
        std::thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.get(&"x".to_string()).unwrap(), None);
        let stats = cache.stats().unwrap();
        assert_eq!(stats.expired_removals, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn scenario_update_preserves_size_and_evictions() {
        // spec.md §8 scenario 5.
        let cache = engine(2);
        cache.put("a".to_string(), 1, None).unwrap();
        cache.put("b".to_string(), 2, None).unwrap();
        cache.put("a".to_string(), 9, None).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.current_size, 2);
        assert_eq!(stats.evictions, 0);
        assert_eq!(cache.get(&"a".to_string()).unwrap(), Some(9));
        assert_eq!(cache.get(&"b".to_string()).unwrap(), Some(2));
    }

    #[test]
    fn delete_absent_key_is_not_found() {
        let cache = engine(10);
        let err = cache.delete(&"missing".to_string()).unwrap_err();
        assert_eq!(err, HkvError::NotFound);
    }

    #[test]
    fn delete_does_not_count_as_miss() {
        let cache = engine(10);
        cache.put("a".to_string(), 1, None).unwrap();
        cache.delete(&"a".to_string()).unwrap();
        assert_eq!(cache.stats().unwrap().misses, 0);
    }

    #[test]
    fn clear_preserves_counters() {
        let cache = engine(10);
        cache.put("a".to_string(), 1, None).unwrap();
        cache.get(&"a".to_string()).unwrap();
        cache.get(&"missing".to_string()).unwrap();

        cache.clear().unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.current_size, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!(cache.all().unwrap().is_empty());
    }

    #[test]
    fn all_is_mru_to_lru_and_excludes_expired() {
        let cache = engine(10);
        cache.put("a".to_string(), 1, None).unwrap();
        cache
            .put("b".to_string(), 2, Some(Duration::from_millis(20)))
            .unwrap();
        cache.put("c".to_string(), 3, None).unwrap();
        std::thread::sleep(Duration::from_millis(40));

        let entries = cache.all().unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.clone()).collect();
        assert_eq!(keys, vec!["c".to_string(), "a".to_string()]);
    }

    #[test]
    fn shutdown_rejects_subsequent_operations() {
        let cache = engine(10);
        cache.put("a".to_string(), 1, None).unwrap();
        cache.shutdown();

        assert_eq!(cache.get(&"a".to_string()).unwrap_err(), HkvError::Shutdown);
        assert_eq!(
            cache.put("b".to_string(), 2, None).unwrap_err(),
            HkvError::Shutdown
        );
    }

    #[test]
    fn sweeper_reaps_between_accesses() {
        let cache = Arc::new(Cache::<String, i32>::new(EngineConfig {
            max_size: 10,
            default_ttl: None,
            sweep_interval: Duration::from_millis(10),
        }));
        cache.start_sweeper();

        cache
            .put("x".to_string(), 1, Some(Duration::from_millis(20)))
            .unwrap();
        cache
            .put("y".to_string(), 2, Some(Duration::from_millis(20)))
            .unwrap();

        std::thread::sleep(Duration::from_millis(100));

        let stats = cache.stats().unwrap();
        assert_eq!(stats.current_size, 0);
        assert_eq!(stats.expired_removals, 2);

        cache.shutdown();
    }

    #[test]
    fn sweep_batch_terminates_on_a_dense_store() {
        // A store with no free-list holes returns a full `SWEEP_BATCH_SIZE`
        // scan every call; sweep_batch must still terminate in one logical
        // sweep instead of spinning on `scanned < SWEEP_BATCH_SIZE` forever.
        let count = SWEEP_BATCH_SIZE + 10;
        let cache = Cache::<String, i32>::new(EngineConfig::with_max_size(count));
        for i in 0..count {
            cache.put(format!("k{i}"), i as i32, None).unwrap();
        }

        let removed = cache.sweep_batch(Instant::now());

        assert_eq!(removed, 0);
        assert_eq!(cache.stats().unwrap().current_size, count);
    }

    #[test]
    fn shutdown_does_not_hang_with_a_dense_store_mid_sweep() {
        // Regression for the same spin: if sweep_batch never returns,
        // start_sweeper's thread never reaches its next sleep, and
        // SweeperHandle::stop()'s join() hangs. This exercises the whole
        // path end to end with a dense store larger than one batch.
        let count = SWEEP_BATCH_SIZE + 10;
        let cache = Arc::new(Cache::<String, i32>::new(EngineConfig {
            max_size: count,
            default_ttl: Some(Duration::from_millis(20)),
            sweep_interval: Duration::from_millis(5),
        }));
        for i in 0..count {
            cache.put(format!("k{i}"), i as i32, None).unwrap();
        }
        cache.start_sweeper();

        std::thread::sleep(Duration::from_millis(60));
        cache.shutdown();

        assert_eq!(cache.stats().unwrap_err(), HkvError::Shutdown);
    }
}

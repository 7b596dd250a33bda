//! Property-style stress test: many threads hammering a shared engine with
//! randomized `put`/`get`/`delete`, asserting the invariants from the
//! engine's contract hold at termination.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hkv_engine::{Cache, EngineConfig};

const THREADS: usize = 8;
const OPS_PER_THREAD: usize = 5_000;
const KEY_SPACE: usize = 64;
const MAX_SIZE: usize = 32;

/// Tiny deterministic PRNG, seeded per-thread, matching the dependency-free
/// style used by the benchmark harness rather than pulling in a fuzzing
/// crate for a single stress test.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        XorShift64 {
            state: seed | 1,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

#[test]
fn concurrent_operations_preserve_invariants() {
    let engine = Arc::new(Cache::<String, u64>::new(EngineConfig::with_max_size(
        MAX_SIZE,
    )));

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_idx| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut rng = XorShift64::new(0x9E37_79B9_7F4A_7C15 ^ (thread_idx as u64 + 1));
                for _ in 0..OPS_PER_THREAD {
                    let key = format!("k{}", rng.next_u64() as usize % KEY_SPACE);
                    match rng.next_u64() % 3 {
                        0 => {
                            let ttl = if rng.next_u64() % 4 == 0 {
                                Some(Duration::from_millis(1 + rng.next_u64() % 5))
                            } else {
                                None
                            };
                            let _ = engine.put(key, rng.next_u64(), ttl);
                        }
                        1 => {
                            let _ = engine.get(&key);
                        }
                        _ => {
                            let _ = engine.delete(&key);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    // Invariant 2: capacity bound.
    let stats = engine.stats().expect("engine still alive");
    assert!(stats.current_size <= MAX_SIZE);

    // Invariant 4: counters are non-decreasing and consistent with their
    // own definition (checked here as a closed-form relation on the final
    // snapshot, since the counters themselves only ever increase).
    assert_eq!(stats.total_requests, stats.hits + stats.misses);

    // A final round of all() must not panic and must respect the MRU-at-head
    // invariant on a `CacheKey`-indexed store (no orphaned keys in the list).
    let entries = engine.all().expect("engine still alive");
    assert!(entries.len() <= MAX_SIZE);
    assert_eq!(entries.len(), stats.current_size);
}

#[test]
fn shutdown_during_concurrent_access_is_safe() {
    // Shutdown must be safe to call while other threads are mid-flight:
    // every in-progress and subsequent call either completes normally or
    // observes `Shutdown`, never a panic or a desynced store.
    let engine = Arc::new(Cache::<String, u64>::new(EngineConfig::with_max_size(16)));
    for i in 0..16u64 {
        engine.put(format!("k{i}"), i, None).unwrap();
    }

    let workers: Vec<_> = (0..4)
        .map(|thread_idx| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut rng = XorShift64::new(0xD1B5_4A32_D192_ED03 ^ (thread_idx as u64 + 1));
                for _ in 0..1_000 {
                    let key = format!("k{}", rng.next_u64() % 16);
                    match rng.next_u64() % 2 {
                        0 => {
                            let _ = engine.get(&key);
                        }
                        _ => {
                            let _ = engine.put(key, rng.next_u64(), None);
                        }
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_micros(200));
    engine.shutdown();

    for worker in workers {
        worker.join().expect("worker thread panicked");
    }

    assert_eq!(
        engine.get(&"k0".to_string()),
        Err(hkv_common::HkvError::Shutdown)
    );
}

//! # Background Sweeper
//!
//! Purpose: Drive a long-lived periodic task that reaps expired entries
//! between accesses, independent of (and best-effort relative to) the
//! lazy expiry check performed on every `get`.
//!
//! ## Design Principles
//!
//! 1. **Dedicated Thread, Not a Poll Loop**: Sleeps on a condition
//!    variable instead of `thread::sleep`, so `stop()` wakes it
//!    immediately instead of waiting out the rest of the interval.
//! 2. **Cooperative Shutdown**: The stop flag is checked between batches;
//!    an in-flight sweep always finishes its current batch.
//! 3. **Observable State Machine**: `Idle -> Sleeping -> Sweeping ->
//!    Sleeping -> ... -> Stopping -> Stopped`, exposed for tests and
//!    introspection, distinct from the condvar used for the wait itself.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Lifecycle state of the background sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    /// Thread has not started its first sleep yet.
    Idle,
    /// Waiting for the next interval tick or a stop signal.
    Sleeping,
    /// Actively walking the store for expired entries.
    Sweeping,
    /// Stop has been requested; finishing the current batch.
    Stopping,
    /// Thread has exited.
    Stopped,
}

impl SweeperState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SweeperState::Idle,
            1 => SweeperState::Sleeping,
            2 => SweeperState::Sweeping,
            3 => SweeperState::Stopping,
            _ => SweeperState::Stopped,
        }
    }
}

struct Shared {
    state: AtomicU8,
    cv: Condvar,
    /// Stop flag, guarded by the same mutex the condvar waits on. Setting
    /// it and calling `notify_all` both happen while this lock is held, so
    /// the thread can never leave one `wait_while_for` call and enter the
    /// next without observing a stop request made in between (no
    /// lost-wakeup window).
    stop: Mutex<bool>,
}

/// Handle to a running sweeper thread.
///
/// Must be stopped explicitly via [`SweeperHandle::stop`] to avoid leaking
/// the background thread; there is no `Drop`-triggered shutdown, matching
/// the teacher's `ExpirationHandle` contract.
pub struct SweeperHandle {
    shared: Arc<Shared>,
    join: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Spawns a sweeper thread that calls `sweep_once` on every tick of
    /// `interval` until stopped.
    ///
    /// `sweep_once` receives the current monotonic time and returns the
    /// number of entries it removed (unused by the sweeper itself; callers
    /// typically feed it into the engine's `expired_removals` counter from
    /// within the closure).
    pub fn spawn<F>(interval: Duration, mut sweep_once: F) -> Self
    where
        F: FnMut(Instant) -> usize + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: AtomicU8::new(SweeperState::Idle as u8),
            cv: Condvar::new(),
            stop: Mutex::new(false),
        });
        let thread_shared = Arc::clone(&shared);

        let join = std::thread::spawn(move || {
            loop {
                thread_shared
                    .state
                    .store(SweeperState::Sleeping as u8, Ordering::Release);

                let mut guard = thread_shared.stop.lock();
                if !*guard {
                    let _ = thread_shared
                        .cv
                        .wait_while_for(&mut guard, |stop| !*stop, interval);
                }
                let should_stop = *guard;
                drop(guard);

                if should_stop {
                    break;
                }

                thread_shared
                    .state
                    .store(SweeperState::Sweeping as u8, Ordering::Release);
                sweep_once(Instant::now());

                if *thread_shared.stop.lock() {
                    break;
                }
            }
            thread_shared
                .state
                .store(SweeperState::Stopped as u8, Ordering::Release);
        });

        SweeperHandle {
            shared,
            join: Some(join),
        }
    }

    /// Returns the sweeper's current lifecycle state.
    pub fn state(&self) -> SweeperState {
        SweeperState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Signals the sweeper to stop and waits for the thread to finish its
    /// current batch (if any) and exit.
    pub fn stop(mut self) {
        self.shared
            .state
            .store(SweeperState::Stopping as u8, Ordering::Release);
        {
            let mut guard = self.shared.stop.lock();
            *guard = true;
        }
        self.shared.cv.notify_all();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn sweeper_runs_and_stops_cleanly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let handle = SweeperHandle::spawn(Duration::from_millis(5), move |_now| {
            counter_clone.fetch_add(1, Ordering::Relaxed);
            0
        });

        std::thread::sleep(Duration::from_millis(30));
        handle.stop();

        assert!(counter.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn stop_wakes_sweeper_immediately() {
        let handle = SweeperHandle::spawn(Duration::from_secs(60), |_now| 0);
        let start = Instant::now();
        handle.stop();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}

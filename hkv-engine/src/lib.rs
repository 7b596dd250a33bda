//! In-process, thread-safe, bounded-capacity cache engine with per-entry
//! TTL, LRU eviction, and observable hit/miss/eviction counters.
//!
//! This crate has no knowledge of any transport: `hkv-server` embeds a
//! [`Cache`] behind an HTTP façade, `hkv-bench` drives one directly.

pub mod config;
pub mod engine;
pub mod key;
pub mod metrics;
pub mod store;
pub mod sweeper;

pub use config::EngineConfig;
pub use engine::{Cache, CacheEntry};
pub use key::CacheKey;
pub use metrics::{Metrics, MetricsSnapshot};
pub use sweeper::{SweeperHandle, SweeperState};

//! # Engine Configuration
//!
//! Purpose: Construction-time, read-only-thereafter configuration for a
//! cache engine instance.

use std::time::Duration;

/// Default maximum number of entries when unset.
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Default sweeper wake interval.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2);

/// Configuration for a cache engine, fixed for the lifetime of the engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Maximum number of live entries before LRU eviction kicks in.
    pub max_size: usize,
    /// TTL applied to `put` calls that don't specify one explicitly.
    pub default_ttl: Option<Duration>,
    /// How often the background sweeper wakes to reap expired entries.
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_size: DEFAULT_MAX_SIZE,
            default_ttl: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with the given capacity and otherwise
    /// default TTL/sweep settings.
    pub fn with_max_size(max_size: usize) -> Self {
        EngineConfig {
            max_size: max_size.max(1),
            ..Default::default()
        }
    }
}

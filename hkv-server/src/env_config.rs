//! # Process Configuration
//!
//! Purpose: Read the environment variables that configure the engine and
//! the HTTP listener, failing fast on malformed values rather than
//! silently falling back — config is read-only after the engine is
//! constructed, so a bad value must be caught before that happens.

use std::time::Duration;

use hkv_engine::EngineConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_RUST_LOG: &str = "info,tower_http=debug";

pub struct ServerConfig {
    pub engine: EngineConfig,
    pub bind_addr: String,
}

/// Reads `CACHE_MAX_SIZE`, `CACHE_DEFAULT_TTL`, `CACHE_SWEEP_INTERVAL`, and
/// `HKV_BIND_ADDR` from the environment, applying documented defaults.
pub fn load() -> Result<ServerConfig, String> {
    let max_size = parse_env("CACHE_MAX_SIZE", 1000usize)?;
    let default_ttl_secs = parse_env("CACHE_DEFAULT_TTL", 0u64)?;
    let sweep_interval_secs = parse_env("CACHE_SWEEP_INTERVAL", 2u64)?;
    let bind_addr = std::env::var("HKV_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    Ok(ServerConfig {
        engine: EngineConfig {
            max_size: max_size.max(1),
            default_ttl: if default_ttl_secs == 0 {
                None
            } else {
                Some(Duration::from_secs(default_ttl_secs))
            },
            sweep_interval: Duration::from_secs(sweep_interval_secs.max(1)),
        },
        bind_addr,
    })
}

/// Returns the `EnvFilter` directive for `RUST_LOG`, falling back to the
/// documented default when unset.
pub fn log_filter() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.to_string())
}

fn parse_env<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| format!("invalid value for {name}={raw:?}: {err}")),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(std::env::VarError::NotUnicode(_)) => {
            Err(format!("{name} is not valid unicode"))
        }
    }
}

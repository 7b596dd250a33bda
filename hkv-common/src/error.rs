//! # Error Taxonomy
//!
//! Purpose: Define the engine-level error kinds shared between the cache
//! engine and the HTTP adapter, independent of transport-specific codes.
//!
//! ## Design Principles
//!
//! 1. **Engine-Level, Not Transport-Level**: Variants describe why an
//!    operation failed in terms the engine understands; mapping to HTTP
//!    status codes is the adapter's job, not this crate's.
//! 2. **No Partial Mutation**: Every operation that can return one of
//!    these errors has not mutated the store before returning it.
//! 3. **Programmer Errors Are Not Here**: A desynced index/list or other
//!    broken invariant is not represented as an `HkvError` — it should
//!    panic in the component that detects it.

use thiserror::Error;

/// Result type returned by engine operations.
pub type HkvResult<T> = Result<T, HkvError>;

/// Errors surfaced by cache engine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HkvError {
    /// The key was empty or otherwise malformed.
    #[error("invalid key")]
    InvalidKey,

    /// The requested TTL was non-positive.
    #[error("invalid ttl: must be a positive number of seconds")]
    InvalidTTL,

    /// The key is not present in the store.
    #[error("key not found")]
    NotFound,

    /// The engine has been shut down and is no longer accepting operations.
    #[error("engine is shut down")]
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(HkvError::InvalidKey.to_string(), "invalid key");
        assert_eq!(HkvError::NotFound.to_string(), "key not found");
    }
}

//! # hkv-common
//!
//! Shared error taxonomy for the HybridKV cache engine and its HTTP
//! adapter.

pub mod error;

pub use error::{HkvError, HkvResult};

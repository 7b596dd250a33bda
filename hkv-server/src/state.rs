//! # Shared Application State
//!
//! Purpose: The state axum hands to every handler: the cache engine and
//! the adapter-level request metrics.

use std::sync::Arc;

use hkv_engine::Cache;

use crate::metrics::Metrics;

/// Concrete cache instantiation backing the HTTP façade: string keys,
/// arbitrary JSON values.
pub type HkvCache = Cache<String, serde_json::Value>;

/// State shared across every axum handler.
pub struct AppState {
    pub cache: Arc<HkvCache>,
    pub metrics: Metrics,
}

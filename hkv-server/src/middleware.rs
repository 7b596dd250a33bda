//! # Request Metrics Middleware
//!
//! Purpose: Wrap every handler with the adapter-level request accounting
//! from `metrics.rs` — total/error counts and end-to-end latency —
//! independent of how long the engine's own lock was held.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.metrics.record_request_start();
    let start = Instant::now();

    let response = next.run(request).await;

    state.metrics.record_request_end(start.elapsed());
    if response.status().is_client_error() || response.status().is_server_error() {
        state.metrics.record_error();
    }

    response
}

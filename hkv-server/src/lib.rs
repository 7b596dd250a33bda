//! HTTP façade for the in-process cache engine.
//!
//! Builds the axum [`Router`] as a library function so it can be driven
//! both by the real `main` (bound to a socket) and by in-process request
//! tests via `tower::ServiceExt::oneshot`.

pub mod env_config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod state;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{middleware as axum_middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use state::{AppState, HkvCache};

/// Assembles the full router: cache routes, the adapter metrics endpoint,
/// the static inspection UI fallback, and the cross-cutting layers.
pub fn app(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .route("/put", post(handlers::put))
        .route("/get", get(handlers::get))
        .route("/delete", delete(handlers::delete))
        .route("/clear", post(handlers::clear))
        .route("/stats", get(handlers::stats))
        .route("/all", get(handlers::all))
        .route("/metrics", get(handlers::metrics))
        .fallback_service(ServeDir::new(static_dir))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! # HTTP Handlers
//!
//! Purpose: Thin translators over the cache engine, one handler per
//! endpoint in the adapter's surface. Each handler is a pure dispatcher:
//! validate the wire-shaped input, call the engine, map the result.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use hkv_common::HkvError;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PutRequest {
    key: String,
    value: serde_json::Value,
    ttl: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct GetResponse {
    key: String,
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    key: String,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    key: String,
    value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    hits: u64,
    misses: u64,
    /// Rendered with `format_hit_rate` as a fixed-3-decimal JSON number
    /// (`0.5` -> `"0.500"` on the wire, unquoted) per spec.md §6.2's "3
    /// decimal rendering" — `f64`'s default `Serialize` drops trailing
    /// zeros, which doesn't satisfy that.
    hit_rate: Box<serde_json::value::RawValue>,
    total_requests: u64,
    current_size: usize,
    evictions: u64,
    expired_removals: u64,
}

pub async fn put(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PutRequest>,
) -> Result<StatusCode, ApiError> {
    let ttl = match request.ttl {
        None => None,
        Some(0) => return Err(ApiError(HkvError::InvalidTTL)),
        Some(seconds) => Some(Duration::from_secs(seconds)),
    };

    state.cache.put(request.key, request.value, ttl)?;
    Ok(StatusCode::OK)
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Query(query): Query<KeyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    match state.cache.get(&query.key)? {
        Some(value) => Ok(Json(GetResponse {
            key: query.key,
            value,
        })),
        None => Err(ApiError(HkvError::NotFound)),
    }
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Query(query): Query<KeyQuery>,
) -> Result<StatusCode, ApiError> {
    state.cache.delete(&query.key)?;
    Ok(StatusCode::OK)
}

pub async fn clear(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.cache.clear()?;
    Ok(StatusCode::OK)
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.cache.stats()?;
    Ok(Json(StatsResponse {
        hits: snapshot.hits,
        misses: snapshot.misses,
        hit_rate: format_hit_rate(snapshot.hit_rate),
        total_requests: snapshot.total_requests,
        current_size: snapshot.current_size,
        evictions: snapshot.evictions,
        expired_removals: snapshot.expired_removals,
    }))
}

pub async fn all(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let entries = state.cache.all()?;
    let body: Vec<EntryResponse> = entries
        .into_iter()
        .map(|entry| EntryResponse {
            key: entry.key,
            value: entry.value,
        })
        .collect();
    Ok(Json(body))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.metrics.snapshot();
    Json(serde_json::json!({
        "requests_total": snapshot.requests_total,
        "errors_total": snapshot.errors_total,
        "inflight": snapshot.inflight,
        "latency": {
            "bounds_us": snapshot.latency.bounds_us,
            "buckets": snapshot.latency.buckets,
            "samples": snapshot.latency.samples,
            "sum_us": snapshot.latency.sum_us,
        },
    }))
}

/// Renders `hit_rate` as a JSON number with exactly 3 decimal digits,
/// trailing zeros included (spec.md §6.2).
fn format_hit_rate(value: f64) -> Box<serde_json::value::RawValue> {
    let text = format!("{value:.3}");
    serde_json::value::RawValue::from_string(text)
        .expect("fixed-point formatting of a finite f64 is always valid JSON number syntax")
}

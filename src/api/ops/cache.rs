//! Cache statistics and cleanup endpoints

use axum::{extract::State, Json};

use crate::api::state::AppState;
use crate::domain::{CacheStats, CleanupReport};

/// GET /cache/stats
pub async fn stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// POST /cache/cleanup - purges expired entries from every tier
pub async fn cleanup(State(state): State<AppState>) -> Json<CleanupReport> {
    Json(state.cache.cleanup().await)
}

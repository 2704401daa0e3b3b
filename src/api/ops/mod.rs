//! Operational endpoints: cache maintenance, recalculation triggers, travel

pub mod cache;
pub mod recalculations;
pub mod travel;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

pub fn create_ops_router() -> Router<AppState> {
    Router::new()
        .route("/cache/stats", get(cache::stats))
        .route("/cache/cleanup", post(cache::cleanup))
        .route(
            "/recalculations/professionals/{professional_id}",
            post(recalculations::trigger_professional),
        )
        .route(
            "/recalculations/requests/{request_id}",
            post(recalculations::trigger_request),
        )
        .route("/recalculations/{run_id}", get(recalculations::get_run))
        .route(
            "/travel/{request_id}/professionals/{professional_id}",
            post(travel::compute),
        )
}

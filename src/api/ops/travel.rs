//! Synchronous travel computation

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::state::AppState;
use crate::api::types::{ApiError, TravelInfoResponse};

/// POST /travel/{request_id}/professionals/{professional_id}
pub async fn compute(
    State(state): State<AppState>,
    Path((request_id, professional_id)): Path<(String, String)>,
) -> Result<Json<TravelInfoResponse>, ApiError> {
    let info = state
        .travel
        .compute_and_store(&request_id, &professional_id)
        .await?;

    Ok(Json(TravelInfoResponse::from(info)))
}

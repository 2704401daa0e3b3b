//! Recalculation trigger and status endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::api::state::AppState;
use crate::api::types::{ApiError, RecalcRunResponse, RecalculationQuery, RunAccepted};
use crate::domain::RecalcRunId;

/// POST /recalculations/professionals/{professional_id}[?force=true]
pub async fn trigger_professional(
    State(state): State<AppState>,
    Path(professional_id): Path<String>,
    Query(query): Query<RecalculationQuery>,
) -> (StatusCode, Json<RunAccepted>) {
    let run_id = if query.force {
        state.orchestrator.recalculate_manual(&professional_id).await
    } else {
        state
            .orchestrator
            .on_professional_address_changed(&professional_id)
            .await
    };

    (StatusCode::ACCEPTED, Json(RunAccepted::new(&run_id)))
}

/// POST /recalculations/requests/{request_id}
pub async fn trigger_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> (StatusCode, Json<RunAccepted>) {
    let run_id = state.orchestrator.on_request_address_changed(&request_id).await;

    (StatusCode::ACCEPTED, Json(RunAccepted::new(&run_id)))
}

/// GET /recalculations/{run_id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RecalcRunResponse>, ApiError> {
    let id = RecalcRunId::new(run_id.as_str())?;

    match state.orchestrator.status(&id).await? {
        Some(run) => Ok(Json(RecalcRunResponse::from(run))),
        None => Err(ApiError::not_found(format!(
            "Recalculation run '{}' not found",
            run_id
        ))),
    }
}

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use super::types::{AskRequest, AskResponse, HealthResponse};
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::services::Embedder;

pub async fn health<E: Embedder + 'static>(State(state): State<Arc<AppState<E>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        fragments: state.fragment_count(),
    })
}

pub async fn ask<E: Embedder + 'static>(
    State(state): State<Arc<AppState<E>>>,
    Json(request): Json<AskRequest>,
) -> AppResult<Json<AskResponse>> {
    let response = state.ask(&request.query, request.k).await?;
    Ok(Json(response))
}

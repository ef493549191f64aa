use crate::dtos::LineResponse;
use crate::models::{Actor, UpdateLine};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn update_line(
    State(state): State<AppState>,
    actor: Actor,
    Path(line_id): Path<Uuid>,
    Json(patch): Json<UpdateLine>,
) -> Result<Json<LineResponse>, AppError> {
    let line = state.service.update_line(line_id, patch, &actor).await?;
    Ok(Json(line.into()))
}

pub async fn remove_line(
    State(state): State<AppState>,
    actor: Actor,
    Path(line_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.service.remove_line(line_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

use crate::domain::Totals;
use crate::dtos::{
    ChangeStatusRequest, DocumentResponse, LineResponse, ReorderLinesRequest, UpdateNotesRequest,
};
use crate::models::{Actor, CreateDocument, LineInput, UpdateDetails};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn create_document(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<CreateDocument>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let document = state.service.create_document(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(document.into())))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state.service.get_document(document_id).await?;
    Ok(Json(document.into()))
}

pub async fn tax_breakdown(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Totals>, AppError> {
    Ok(Json(state.service.tax_breakdown(document_id).await?))
}

pub async fn update_details(
    State(state): State<AppState>,
    actor: Actor,
    Path(document_id): Path<Uuid>,
    Json(input): Json<UpdateDetails>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state
        .service
        .update_details(document_id, input, &actor)
        .await?;
    Ok(Json(document.into()))
}

pub async fn update_notes(
    State(state): State<AppState>,
    actor: Actor,
    Path(document_id): Path<Uuid>,
    Json(body): Json<UpdateNotesRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state
        .service
        .update_notes(document_id, body.notes, &actor)
        .await?;
    Ok(Json(document.into()))
}

pub async fn change_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(document_id): Path<Uuid>,
    Json(body): Json<ChangeStatusRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state
        .service
        .change_status(document_id, body.status, &actor)
        .await?;
    Ok(Json(document.into()))
}

pub async fn delete_document(
    State(state): State<AppState>,
    actor: Actor,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state.service.delete_document(document_id, &actor).await?;
    Ok(Json(document.into()))
}

pub async fn new_version(
    State(state): State<AppState>,
    actor: Actor,
    Path(document_id): Path<Uuid>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let draft = state.service.new_version(document_id, &actor).await?;
    Ok((StatusCode::CREATED, Json(draft.into())))
}

pub async fn duplicate(
    State(state): State<AppState>,
    actor: Actor,
    Path(document_id): Path<Uuid>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let draft = state.service.duplicate(document_id, &actor).await?;
    Ok((StatusCode::CREATED, Json(draft.into())))
}

pub async fn convert_to_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(document_id): Path<Uuid>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let invoice = state
        .service
        .convert_to_invoice(document_id, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

pub async fn add_line(
    State(state): State<AppState>,
    actor: Actor,
    Path(document_id): Path<Uuid>,
    Json(input): Json<LineInput>,
) -> Result<(StatusCode, Json<LineResponse>), AppError> {
    let line = state.service.add_line(document_id, input, &actor).await?;
    Ok((StatusCode::CREATED, Json(line.into())))
}

pub async fn reorder_lines(
    State(state): State<AppState>,
    actor: Actor,
    Path(document_id): Path<Uuid>,
    Json(body): Json<ReorderLinesRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state
        .service
        .reorder_lines(document_id, body.line_ids, &actor)
        .await?;
    Ok(Json(document.into()))
}

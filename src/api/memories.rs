use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

use super::auth::CurrentUser;
use super::types::{AuthorDto, CreateMemoryRequest, MemoryDto, UpdateMemoryRequest};
use super::validation;
use super::{ApiError, ApiResponse, AppState};
use crate::db::query::ListParams;

/// GET /api/v1/memories
pub async fn list_memories(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, ApiError> {
    let params = ListParams(params);
    let rows = state.store().memories().list(&params).await?;
    let results = rows.len();
    Ok(Json(ApiResponse::success_with_results(rows, results)))
}

/// GET /api/v1/memories/{id}
pub async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MemoryDto>>, ApiError> {
    if state.store().memories().get(id).await?.is_none() {
        return Err(ApiError::not_found("Memory", id));
    }
    state.store().memories().increment_views(id).await?;

    let (memory, author) = state
        .store()
        .memories()
        .get_with_author(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Memory", id))?;

    let author = author.as_ref().map(AuthorDto::from);
    Ok(Json(ApiResponse::success(MemoryDto::from_model(
        memory, author,
    ))))
}

/// POST /api/v1/memories
pub async fn create_memory(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateMemoryRequest>,
) -> Result<Response, ApiError> {
    validation::validate_memory_content(&payload.content)?;

    let author_id = payload.author.unwrap_or(current.0.id);
    let memory = state
        .store()
        .memories()
        .create(payload.content, author_id)
        .await?;

    let dto = MemoryDto::from_model(memory, Some(AuthorDto::from(&current.0)));
    Ok((StatusCode::CREATED, Json(ApiResponse::success(dto))).into_response())
}

/// PATCH /api/v1/memories/{id}
pub async fn update_memory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateMemoryRequest>,
) -> Result<Json<ApiResponse<MemoryDto>>, ApiError> {
    validation::validate_memory_content(&payload.content)?;

    let memory = state
        .store()
        .memories()
        .update(id, payload.content)
        .await?
        .ok_or_else(|| ApiError::not_found("Memory", id))?;

    Ok(Json(ApiResponse::success(MemoryDto::from_model(
        memory, None,
    ))))
}

/// DELETE /api/v1/memories/{id}
pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.store().memories().delete(id).await?;
    if !deleted {
        return Err(ApiError::not_found("Memory", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

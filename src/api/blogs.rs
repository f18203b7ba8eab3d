use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

use super::auth::CurrentUser;
use super::types::{AuthorDto, BlogDto, CreateBlogRequest, UpdateBlogRequest};
use super::validation;
use super::{ApiError, ApiResponse, AppState};
use crate::db::query::ListParams;
use crate::db::repositories::blog::{BlogChanges, NewBlog};

/// GET /api/v1/blogs
///
/// Public listing with the full filter/sort/select/paginate pipeline.
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, ApiError> {
    let params = ListParams(params);
    let rows = state.store().blogs().list(&params).await?;
    let results = rows.len();
    Ok(Json(ApiResponse::success_with_results(rows, results)))
}

/// GET /api/v1/blogs/{id}
///
/// Each read counts as a view; the increment happens before the fetch so
/// the returned count includes this read.
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<BlogDto>>, ApiError> {
    if state.store().blogs().get(id).await?.is_none() {
        return Err(ApiError::not_found("Blog", id));
    }
    state.store().blogs().increment_views(id).await?;

    let (blog, author) = state
        .store()
        .blogs()
        .get_with_author(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog", id))?;

    let author = author.as_ref().map(AuthorDto::from);
    Ok(Json(ApiResponse::success(BlogDto::from_model(blog, author))))
}

/// POST /api/v1/blogs
pub async fn create_blog(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateBlogRequest>,
) -> Result<Response, ApiError> {
    validation::validate_new_blog(&payload)?;

    let new_blog = NewBlog {
        heading: payload.heading,
        description: payload.description,
        featured_image: payload.featured_image,
        content: payload.content,
        tags: payload.tags,
        blog_type: payload.blog_type.unwrap_or_else(|| "blog".to_string()),
        category: payload.category,
        author_id: payload.author.unwrap_or(current.0.id),
    };
    let blog = state.store().blogs().create(new_blog).await?;

    tracing::info!(blog_id = blog.id, author_id = blog.author_id, "Blog created");

    // The author may differ from the caller, so embed whoever owns the row.
    let author = if blog.author_id == current.0.id {
        Some(AuthorDto::from(&current.0))
    } else {
        state
            .store()
            .users()
            .get_by_id(blog.author_id)
            .await?
            .as_ref()
            .map(AuthorDto::from)
    };
    let dto = BlogDto::from_model(blog, author);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(dto))).into_response())
}

/// PATCH /api/v1/blogs/{id}
pub async fn update_blog(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBlogRequest>,
) -> Result<Json<ApiResponse<BlogDto>>, ApiError> {
    validation::validate_blog_changes(&payload)?;

    let changes = BlogChanges {
        heading: payload.heading,
        description: payload.description,
        featured_image: payload.featured_image,
        content: payload.content,
        tags: payload.tags,
        blog_type: payload.blog_type,
        category: payload.category,
    };
    let blog = state
        .store()
        .blogs()
        .update(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog", id))?;

    Ok(Json(ApiResponse::success(BlogDto::from_model(blog, None))))
}

/// DELETE /api/v1/blogs/{id}
pub async fn delete_blog(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.store().blogs().delete(id).await?;
    if !deleted {
        return Err(ApiError::not_found("Blog", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::collections::HashMap;

use super::auth::CurrentUser;
use super::types::{
    AdminUpdateUserRequest, AuthorDto, FollowRequest, UpdateMeRequest, UserDetailDto, UserDto,
};
use super::validation;
use super::{ApiError, ApiResponse, AppState};
use crate::db::query::ListParams;
use crate::db::repositories::user::{FollowOutcome, UserChanges};

/// GET /api/v1/users/me
pub async fn get_me(
    Extension(current): Extension<CurrentUser>,
) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(current.0)))
}

/// PATCH /api/v1/users/updateMe
///
/// Profile fields only; password changes are rejected here and belong to
/// their own route. Empty-string fields are ignored, matching clients that
/// submit whole forms.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if payload.password.is_some() || payload.password_confirm.is_some() {
        return Err(ApiError::validation(
            "This route is not for password updates. Please use /updateMyPassword",
        ));
    }

    let changes = UserChanges {
        name: present(payload.name),
        username: present(payload.username),
        email: present(payload.email),
        photo: present(payload.photo),
        phone: present(payload.phone),
        passion: present(payload.passion),
        bio: present(payload.bio),
        role: None,
        verified: None,
    };
    if changes.is_empty() {
        return Err(ApiError::validation("No valid fields provided for update"));
    }
    validate_profile_changes(&changes)?;

    if let Some(username) = &changes.username
        && username.to_lowercase() != current.0.username
        && state.store().users().get_by_username(username).await?.is_some()
    {
        return Err(ApiError::conflict("Username is already in use"));
    }
    if let Some(email) = &changes.email
        && email.to_lowercase() != current.0.email
        && state.store().users().get_by_email(email).await?.is_some()
    {
        return Err(ApiError::conflict("Email is already in use"));
    }

    let updated = state
        .store()
        .users()
        .update(current.0.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User", current.0.id))?;

    Ok(Json(ApiResponse::success(UserDto::from(updated))))
}

/// DELETE /api/v1/users/deleteMe
///
/// Deactivates the account. The row survives so authored content keeps a
/// valid owner, but default queries stop returning the user.
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    state.store().users().soft_delete(current.0.id).await?;
    tracing::info!(user_id = current.0.id, "User deactivated their account");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/follow
pub async fn follow_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<FollowRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let outcome = state
        .store()
        .users()
        .follow(current.0.id, payload.user_id)
        .await?;

    match outcome {
        FollowOutcome::Followed => Ok(Json(ApiResponse::success_message("Followed user"))),
        FollowOutcome::AlreadyFollowing => {
            Err(ApiError::conflict("You are already following this user"))
        }
        FollowOutcome::SelfFollow => Err(ApiError::conflict("You cannot follow yourself")),
        FollowOutcome::TargetMissing => Err(ApiError::not_found("User", payload.user_id)),
    }
}

/// GET /api/v1/users  (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, ApiError> {
    let params = ListParams(params);
    let rows = state.store().users().list(&params).await?;
    let results = rows.len();
    Ok(Json(ApiResponse::success_with_results(rows, results)))
}

/// GET /api/v1/users/{id}
///
/// Public profile view with follower and following lists.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDetailDto>>, ApiError> {
    let user = state
        .store()
        .users()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    let followers = state.store().users().followers_of(id).await?;
    let following = state.store().users().following_of(id).await?;

    Ok(Json(ApiResponse::success(UserDetailDto {
        user: UserDto::from(user),
        followers: followers.iter().map(AuthorDto::from).collect(),
        following: following.iter().map(AuthorDto::from).collect(),
    })))
}

/// PATCH /api/v1/users/{id}  (admin)
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let changes = UserChanges {
        name: present(payload.name),
        username: present(payload.username),
        email: present(payload.email),
        photo: present(payload.photo),
        phone: present(payload.phone),
        passion: present(payload.passion),
        bio: present(payload.bio),
        role: present(payload.role),
        verified: payload.verified,
    };
    if changes.is_empty() {
        return Err(ApiError::validation("No valid fields provided for update"));
    }
    validate_profile_changes(&changes)?;
    if let Some(role) = &changes.role {
        validation::validate_role(role)?;
    }

    let target = state
        .store()
        .users()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;
    if let Some(username) = &changes.username
        && username.to_lowercase() != target.username
        && state.store().users().get_by_username(username).await?.is_some()
    {
        return Err(ApiError::conflict("Username is already in use"));
    }
    if let Some(email) = &changes.email
        && email.to_lowercase() != target.email
        && state.store().users().get_by_email(email).await?.is_some()
    {
        return Err(ApiError::conflict("Email is already in use"));
    }

    let updated = state
        .store()
        .users()
        .update(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(UserDto::from(updated))))
}

/// DELETE /api/v1/users/{id}  (admin)
///
/// Deactivation, same as self-deletion; user rows are never dropped.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.store().users().soft_delete(id).await?;
    if !deleted {
        return Err(ApiError::not_found("User", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_profile_changes(changes: &UserChanges) -> Result<(), ApiError> {
    if let Some(name) = &changes.name {
        validation::validate_name(name)?;
    }
    if let Some(username) = &changes.username {
        validation::validate_username(username)?;
    }
    if let Some(email) = &changes.email {
        validation::validate_email(email)?;
    }
    if let Some(phone) = &changes.phone {
        validation::validate_phone(phone)?;
    }
    if let Some(passion) = &changes.passion {
        validation::validate_passion(passion)?;
    }
    if let Some(bio) = &changes.bio {
        validation::validate_bio(bio)?;
    }
    Ok(())
}

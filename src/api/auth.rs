use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{ApiError, ApiResponse, AppState};
use super::types::{
    AuthData, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest,
    TokenClaimsDto, UpdatePasswordRequest, UserDto, VerifyTokenRequest,
};
use super::validation;
use crate::config::Config;
use crate::db::repositories::user::NewUser;
use crate::entities::users;
use crate::services::{TokenService, hash_reset_token};

/// The authenticated caller, inserted by [`require_auth`] and read by
/// downstream handlers via `Extension`.
#[derive(Clone)]
pub struct CurrentUser(pub users::Model);

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware. Accepts the token from either:
/// 1. `Authorization: Bearer <token>` header
/// 2. `jwt` cookie (from login/signup)
///
/// Rejects with 401 when the token is missing, invalid, expired, issued
/// before the user's last password change, or names a deactivated user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_token(request.headers()) else {
        return Err(ApiError::authentication(
            "You are not logged in. Please log in to get access",
        ));
    };

    let claims = state
        .tokens()
        .verify(&token)
        .map_err(|e| ApiError::authentication(e.to_string()))?;
    let user_id = claims
        .user_id()
        .map_err(|e| ApiError::authentication(e.to_string()))?;

    let user = state
        .store()
        .users()
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| {
            ApiError::authentication("The user belonging to this token no longer exists")
        })?;

    TokenService::ensure_fresh(&claims, user.password_changed_at.as_deref())
        .map_err(|e| ApiError::authentication(e.to_string()))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Layered inside [`require_auth`] on admin-only routes.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let is_admin = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(|current| current.0.role == "admin");
    if !is_admin {
        return Err(ApiError::Authorization(
            "You do not have permission to perform this action".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    // Cookie fallback for browser clients.
    if let Some(cookie_header) = headers.get(header::COOKIE)
        && let Ok(cookie_str) = cookie_header.to_str()
    {
        for pair in cookie_str.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=')
                && name == "jwt"
                && !value.is_empty()
            {
                return Some(value.to_string());
            }
        }
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/users/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Response, ApiError> {
    validation::validate_signup(&payload)?;

    let taken = state
        .store()
        .users()
        .username_or_email_taken(&payload.username, &payload.email)
        .await?;
    if taken {
        return Err(ApiError::conflict("Username or email is already in use"));
    }

    let config = state.config().await;
    let new_user = NewUser {
        name: payload.name,
        username: payload.username,
        email: payload.email,
        phone: payload.phone,
        passion: payload.passion,
        bio: payload.bio,
        password: payload.password,
    };
    let user = state
        .store()
        .users()
        .create(new_user, &config.security)
        .await?;

    tracing::info!(user_id = user.id, "New user signed up");
    send_token_response(&state, StatusCode::CREATED, user, &config)
}

/// POST /api/v1/users/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Please provide username and password"));
    }

    let user = state
        .store()
        .users()
        .get_by_username(&payload.username)
        .await?;

    // Same rejection whether the user is missing or the password is wrong.
    let Some(user) = user else {
        return Err(ApiError::authentication("Incorrect username or password"));
    };
    let is_valid = state
        .store()
        .users()
        .verify_password(&payload.password, &user.password_hash)
        .await?;
    if !is_valid {
        return Err(ApiError::authentication("Incorrect username or password"));
    }

    let config = state.config().await;
    send_token_response(&state, StatusCode::OK, user, &config)
}

/// GET /api/v1/users/logout
///
/// Stateless logout: overwrite the cookie with a short-lived placeholder.
/// Bearer clients simply drop their token.
pub async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let config = state.config().await;
    let cookie = build_cookie("loggedout", 10, config.server.secure_cookies);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::<()>::success_message("Logged out")),
    )
        .into_response())
}

/// POST /api/v1/users/forgotPassword
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let user = state
        .store()
        .users()
        .get_by_email(&payload.email)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("There is no user with that email address".to_string())
        })?;

    let config = state.config().await;
    let (raw_token, digest) = crate::services::generate_reset_token();
    state
        .store()
        .users()
        .set_reset_token(user.id, &digest, config.auth.reset_token_ttl_minutes)
        .await?;

    let reset_url = format!(
        "{}/api/v1/users/resetPassword/{raw_token}",
        config.server.public_base_url.trim_end_matches('/')
    );

    // If the mail cannot go out, the token must not stay usable.
    if let Err(e) = state
        .mailer()
        .send_password_reset(&user.email, &user.name, &reset_url)
        .await
    {
        state.store().users().clear_reset_token(user.id).await?;
        tracing::error!("Failed to send password reset email: {e}");
        return Err(ApiError::internal(
            "There was an error sending the email. Try again later",
        ));
    }

    Ok(Json(ApiResponse::success_message("Token sent to email")))
}

/// PATCH /api/v1/users/resetPassword/{token}
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    validation::validate_password_pair(&payload.password, &payload.password_confirm)?;

    let digest = hash_reset_token(&token);
    let user = state
        .store()
        .users()
        .find_by_reset_token(&digest)
        .await?
        .ok_or_else(|| ApiError::validation("Token is invalid or has expired"))?;

    let config = state.config().await;
    let user = state
        .store()
        .users()
        .update_password(user.id, &payload.password, &config.security)
        .await?;

    tracing::info!(user_id = user.id, "Password reset completed");
    send_token_response(&state, StatusCode::OK, user, &config)
}

/// PATCH /api/v1/users/updateMyPassword
pub async fn update_my_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Response, ApiError> {
    let user = &current.0;

    let is_valid = state
        .store()
        .users()
        .verify_password(&payload.password_current, &user.password_hash)
        .await?;
    if !is_valid {
        return Err(ApiError::authentication("Your current password is wrong"));
    }

    validation::validate_password_pair(&payload.password, &payload.password_confirm)?;

    let config = state.config().await;
    let user = state
        .store()
        .users()
        .update_password(user.id, &payload.password, &config.security)
        .await?;

    send_token_response(&state, StatusCode::OK, user, &config)
}

/// POST /api/v1/users/verify-token
///
/// Reports whether a token is currently acceptable, without touching any
/// state. The token comes from the body, falling back to the usual header
/// and cookie sources.
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<VerifyTokenRequest>,
) -> Result<Json<ApiResponse<TokenClaimsDto>>, ApiError> {
    let token = payload
        .token
        .or_else(|| extract_token(&headers))
        .ok_or_else(|| ApiError::authentication("No token provided"))?;

    let claims = state
        .tokens()
        .verify(&token)
        .map_err(|e| ApiError::authentication(e.to_string()))?;
    let user_id = claims
        .user_id()
        .map_err(|e| ApiError::authentication(e.to_string()))?;

    let user = state
        .store()
        .users()
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| {
            ApiError::authentication("The user belonging to this token no longer exists")
        })?;
    TokenService::ensure_fresh(&claims, user.password_changed_at.as_deref())
        .map_err(|e| ApiError::authentication(e.to_string()))?;

    Ok(Json(ApiResponse::success(TokenClaimsDto {
        user_id,
        issued_at: claims.iat,
        expires_at: claims.exp,
    })))
}

// ============================================================================
// Helpers
// ============================================================================

/// Issue a fresh token for `user` and reply with it both in the body and as
/// the `jwt` cookie.
fn send_token_response(
    state: &AppState,
    status: StatusCode,
    user: users::Model,
    config: &Config,
) -> Result<Response, ApiError> {
    let token = state.tokens().issue(user.id)?;
    let max_age = state.tokens().ttl().num_seconds();
    let cookie = build_cookie(&token, max_age, config.server.secure_cookies);

    let body = ApiResponse::success(AuthData {
        token,
        user: UserDto::from(user),
    });
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

fn build_cookie(value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!("jwt={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("jwt=cookie-token; other=1"),
        );
        assert_eq!(extract_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn cookie_is_used_when_header_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; jwt=cookie-token"),
        );
        assert_eq!(extract_token(&headers), Some("cookie-token".to_string()));
    }

    #[test]
    fn missing_token_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("jwt="));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn secure_flag_is_config_driven() {
        let cookie = build_cookie("tok", 60, true);
        assert!(cookie.ends_with("; Secure"));
        let cookie = build_cookie("tok", 60, false);
        assert!(!cookie.contains("Secure"));
    }
}

use axum::{
    Json, Router,
    extract::OriginalUri,
    http::{HeaderValue, StatusCode},
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod blogs;
mod error;
mod memories;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn tokens(&self) -> &crate::services::TokenService {
        &self.shared.tokens
    }

    #[must_use]
    pub fn mailer(&self) -> &Arc<dyn crate::services::Mailer> {
        &self.shared.mailer
    }

    pub async fn config(&self) -> Config {
        self.shared.config().await
    }
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<AppState> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(AppState { shared })
}

pub async fn router(state: AppState) -> Router {
    let cors_origins = {
        let config = state.shared.config.read().await;
        config.server.cors_allowed_origins.clone()
    };

    let api_router = Router::new()
        .nest("/users", user_routes(state.clone()))
        .nest("/blogs", blog_routes(state.clone()))
        .nest("/memories", memory_routes(state.clone()))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", api_router)
        .fallback(not_found)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

/// Public auth endpoints plus the profile routes that need a logged-in
/// caller and the admin-only user management routes.
fn user_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/forgotPassword", post(auth::forgot_password))
        .route("/resetPassword/{token}", patch(auth::reset_password))
        .route("/verify-token", post(auth::verify_token))
        .route("/{id}", get(users::get_user));

    let protected = Router::new()
        .route("/me", get(users::get_me))
        .route("/updateMe", patch(users::update_me))
        .route("/deleteMe", delete(users::delete_me))
        .route("/updateMyPassword", patch(auth::update_my_password))
        .route("/follow", post(users::follow_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    // Admin checks sit inside the auth layer so the token is verified first.
    let admin = Router::new()
        .route("/", get(users::list_users))
        .route("/{id}", patch(users::update_user))
        .route("/{id}", delete(users::delete_user))
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth));

    public.merge(protected).merge(admin)
}

fn blog_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(blogs::list_blogs))
        .route("/{id}", get(blogs::get_blog));

    let protected = Router::new()
        .route("/", post(blogs::create_blog))
        .route("/{id}", patch(blogs::update_blog))
        .route("/{id}", delete(blogs::delete_blog))
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth));

    public.merge(protected)
}

fn memory_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(memories::list_memories))
        .route("/{id}", get(memories::get_memory));

    let protected = Router::new()
        .route("/", post(memories::create_memory))
        .route("/{id}", patch(memories::update_memory))
        .route("/{id}", delete(memories::delete_memory))
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth));

    public.merge(protected)
}

async fn not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::fail(format!(
            "Can't find {uri} on this server"
        ))),
    )
}

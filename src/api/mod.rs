// REST API for the movie catalog

use axum::{
    Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;

use crate::auth::{SessionAuthority, UserStore, require_auth};
use crate::catalog::MovieStore;

mod auth;
mod movies;
pub mod response;
mod users;


pub use response::{ApiError, ApiResponse};

/// Shared handles for every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionAuthority>,
    pub users: UserStore,
    pub movies: MovieStore,
}

/// All routes, without the outer middleware stack.
///
/// Routes needing a caller identity sit behind [`require_auth`]; the rest are
/// public.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/movies", get(movies::list_movies))
        .route("/movies/{id}", get(movies::get_movie));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/users/me", get(users::me))
        .route("/movies", post(movies::create_movie))
        .route(
            "/movies/{id}",
            axum::routing::put(movies::update_movie).delete(movies::delete_movie),
        )
        .route_layer(from_fn_with_state(state.sessions.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", public.merge(protected))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

async fn health_check() -> ApiResponse<Value> {
    ApiResponse::empty(StatusCode::OK, "Service is healthy")
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}

async fn method_not_allowed() -> ApiResponse<Value> {
    ApiResponse::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
}

use axum::{extract::State, http::StatusCode};

use super::AppState;
use super::response::{ApiError, ApiResponse};
use crate::auth::Principal;
use crate::db::schema::UserResponse;

/// The authenticated caller's own account.
pub async fn me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    let user = state
        .users
        .get_user_by_id(principal.user_id())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %principal.user_id(), "error fetching user");
            ApiError::Internal("Error fetching user".to_string())
        })?
        .ok_or_else(|| {
            tracing::warn!(user_id = %principal.user_id(), "user not found");
            ApiError::NotFound("User not found".to_string())
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "User retrieved successfully",
        user.to_response(),
    ))
}

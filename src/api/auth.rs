//! Registration, login and logout.

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::AppState;
use super::response::{ApiError, ApiResponse, json_body};
use crate::auth::Principal;
use crate::db::StoreError;
use crate::db::schema::{LoginInput, UserCreate, UserResponse};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Body of a successful register or login.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: UserResponse,
    pub token: String,
}

fn validate_registration(input: &UserCreate) -> Result<(), ApiError> {
    let mut errors = BTreeMap::new();

    if !input.email.contains('@') {
        errors.insert("email".to_string(), "must be a valid email address".to_string());
    }
    if input.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.insert(
            "password".to_string(),
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<UserCreate>, JsonRejection>,
) -> Result<ApiResponse<AuthPayload>, ApiError> {
    let input = json_body(payload)?;
    validate_registration(&input)?;

    let user = state.users.create_user(&input).await.map_err(|e| match e {
        StoreError::EmailExists => {
            tracing::warn!(email = %input.email, "registration with existing email");
            ApiError::Conflict("Email already exists".to_string())
        }
        other => {
            tracing::error!(error = %other, "error creating user");
            ApiError::Internal("Error creating user".to_string())
        }
    })?;

    let token = state.sessions.issue(&user.user_id).await.map_err(|e| {
        tracing::error!(error = %e, user_id = %user.user_id, "error generating token");
        ApiError::Internal("Error generating token".to_string())
    })?;

    tracing::info!(user_id = %user.user_id, "user registered");
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "User registered successfully",
        AuthPayload {
            user: user.to_response(),
            token,
        },
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<ApiResponse<AuthPayload>, ApiError> {
    let input = json_body(payload)?;

    let user = state
        .users
        .authenticate(&input.email, &input.password)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "error authenticating user");
            ApiError::Internal("Error authenticating user".to_string())
        })?
        .ok_or_else(|| {
            tracing::warn!(email = %input.email, "login failed: invalid credentials");
            ApiError::Unauthorized("Invalid credentials".to_string())
        })?;

    let token = state.sessions.issue(&user.user_id).await.map_err(|e| {
        tracing::error!(error = %e, user_id = %user.user_id, "error generating token");
        ApiError::Internal("Error generating token".to_string())
    })?;

    tracing::info!(user_id = %user.user_id, "user logged in");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Login successful",
        AuthPayload {
            user: user.to_response(),
            token,
        },
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<ApiResponse<Value>, ApiError> {
    state
        .sessions
        .invalidate(principal.user_id())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %principal.user_id(), "error logging out");
            ApiError::Internal("Error logging out".to_string())
        })?;

    tracing::info!(
        user_id = %principal.user_id(),
        ip = principal.ip_address().unwrap_or("-"),
        user_agent = principal.user_agent().unwrap_or("-"),
        "user logged out"
    );
    Ok(ApiResponse::empty(StatusCode::OK, "Successfully logged out"))
}

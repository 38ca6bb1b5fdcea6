//! JSON envelope shared by every endpoint.
//!
//! ```json
//! {"status": "success", "code": 200, "message": "Login successful", "data": {...}}
//! ```

use axum::{
    Json,
    extract::{
        Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// `"success"` or `"error"`
    pub status: &'static str,
    /// Mirrors the HTTP status code
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(code: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            code: code.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<Value> {
    /// Success with `"data": null`.
    pub fn empty(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: "success",
            code: code.as_u16(),
            message: message.into(),
            data: None,
        }
    }

    pub fn error(code: StatusCode, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: "error",
            code: code.as_u16(),
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Errors rendered as an error envelope.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Field-level validation failures, returned in `data`.
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let data = match &self {
            Self::Validation(fields) => serde_json::to_value(fields).ok(),
            _ => None,
        };
        ApiResponse::<Value>::error(self.status(), self.to_string(), data).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        Self::BadRequest("Invalid request body".to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected query string");
        Self::BadRequest("Invalid query parameters".to_string())
    }
}

/// Unwrap a JSON body, mapping any rejection to a 400 envelope.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

/// Unwrap a query string, mapping any rejection to a 400 envelope.
pub fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params.map(|Query(value)| value).map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::success(
            StatusCode::CREATED,
            "Created",
            serde_json::json!({"id": "1"}),
        ))
        .unwrap();

        assert_eq!(body["status"], "success");
        assert_eq!(body["code"], 201);
        assert_eq!(body["message"], "Created");
        assert_eq!(body["data"]["id"], "1");
    }

    #[test]
    fn test_empty_envelope_has_null_data() {
        let body = serde_json::to_value(ApiResponse::<Value>::empty(StatusCode::OK, "ok")).unwrap();
        assert!(body["data"].is_null());
        assert!(body.as_object().unwrap().contains_key("data"));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::Forbidden("Invalid token".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Validation(BTreeMap::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unavailable("down".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_response_status() {
        let response = ApiError::Conflict("Email already exists".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}

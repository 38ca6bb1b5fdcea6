//! Request-scoped identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::response::ApiError;
use crate::types::UserId;

/// The authenticated caller of a protected request.
///
/// Inserted into the request's extensions by
/// [`require_auth`](crate::auth::middleware::require_auth) and nowhere else,
/// so it lives exactly as long as the request it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: UserId,
    /// Client IP address (for audit logging)
    ip_address: Option<String>,
    /// Client user agent (for audit logging)
    user_agent: Option<String>,
}

impl Principal {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_client_info(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Principal>().cloned().ok_or_else(|| {
            // Route was mounted without `require_auth`
            tracing::error!(path = %parts.uri.path(), "protected handler reached without a principal");
            ApiError::Unauthorized("User not authenticated".to_string())
        })
    }
}

//! Bearer-token gate for protected routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use crate::api::response::ApiError;
use crate::auth::context::Principal;
use crate::auth::session::{SessionAuthority, SessionError};

/// Why a request was refused before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    MissingHeader,
    MalformedHeader,
    Expired,
    Invalid,
    Unavailable,
}

impl Rejection {
    fn reason(self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::MalformedHeader => "malformed_header",
            Self::Expired => "expired",
            Self::Invalid => "invalid",
            Self::Unavailable => "unavailable",
        }
    }

    fn into_error(self) -> ApiError {
        match self {
            Self::MissingHeader => ApiError::Unauthorized("Authorization header required".to_string()),
            Self::MalformedHeader => {
                ApiError::Unauthorized("Invalid authorization header format".to_string())
            }
            Self::Expired => ApiError::Unauthorized("Token has expired".to_string()),
            Self::Invalid => ApiError::Forbidden("Invalid token".to_string()),
            Self::Unavailable => {
                ApiError::Unavailable("Authentication service unavailable".to_string())
            }
        }
    }
}

impl From<SessionError> for Rejection {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ExpiredToken => Self::Expired,
            SessionError::InvalidToken => Self::Invalid,
            SessionError::Infrastructure(_) => Self::Unavailable,
        }
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The header must split on single spaces into exactly two parts, the first
/// being `Bearer`. An empty header counts as missing.
fn bearer_token(headers: &HeaderMap) -> Result<&str, Rejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(Rejection::MissingHeader)?
        .to_str()
        .map_err(|_| Rejection::MalformedHeader)?;

    if value.is_empty() {
        return Err(Rejection::MissingHeader);
    }

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] => Ok(*token),
        _ => Err(Rejection::MalformedHeader),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Middleware that admits a request only with a live session token.
///
/// On success the caller's [`Principal`] is attached to the request; on
/// failure the handler never runs. Cache outages are refused with 503 rather
/// than let through.
pub async fn require_auth(
    State(sessions): State<Arc<SessionAuthority>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let outcome = match bearer_token(request.headers()) {
        Ok(token) => sessions.validate(token).await.map_err(Rejection::from),
        Err(rejection) => Err(rejection),
    };

    let user_id = match outcome {
        Ok(user_id) => user_id,
        Err(rejection) => {
            if rejection == Rejection::Unavailable {
                tracing::error!(%method, %path, reason = rejection.reason(), "request refused");
            } else {
                tracing::warn!(%method, %path, reason = rejection.reason(), "request refused");
            }
            return Err(rejection.into_error());
        }
    };

    let headers = request.headers();
    let ip_address =
        header_string(headers, "X-Forwarded-For").or_else(|| header_string(headers, "X-Real-IP"));
    let user_agent = header_string(headers, header::USER_AGENT.as_str());

    tracing::debug!(
        user_id = %user_id,
        %method,
        %path,
        user_agent = user_agent.as_deref().unwrap_or("-"),
        "request authenticated"
    );
    request
        .extensions_mut()
        .insert(Principal::new(user_id).with_client_info(ip_address, user_agent));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cache::{MemoryRevocationCache, RevocationCache};
    use crate::auth::session::tests::FlakyCache;
    use crate::auth::token::{SessionClaims, TokenCodec};
    use crate::types::UserId;
    use axum::{Router, body::Body, http::Request as HttpRequest, http::StatusCode, routing::get};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &[u8] = b"middleware-test-secret";

    struct Harness {
        sessions: Arc<SessionAuthority>,
        hits: Arc<AtomicUsize>,
        router: Router,
    }

    fn harness_with(cache: Arc<dyn RevocationCache>) -> Harness {
        let sessions = Arc::new(SessionAuthority::new(
            TokenCodec::new(SECRET),
            cache,
            Duration::from_secs(3600),
        ));
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let router = Router::new()
            .route(
                "/protected",
                get(move |principal: Principal| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        axum::Json(principal.user_id().to_string())
                    }
                }),
            )
            .route_layer(axum::middleware::from_fn_with_state(
                sessions.clone(),
                require_auth,
            ));

        Harness {
            sessions,
            hits,
            router,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(MemoryRevocationCache::new()))
    }

    async fn call(router: &Router, authorization: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = HttpRequest::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()));
        (status, body)
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(Rejection::MissingHeader));

        headers.insert(header::AUTHORIZATION, "".parse().unwrap());
        assert_eq!(bearer_token(&headers), Err(Rejection::MissingHeader));

        for bad in ["Token abc", "Bearer", "Bearer a b", "bearer abc", "Bearer  abc"] {
            headers.insert(header::AUTHORIZATION, bad.parse().unwrap());
            assert_eq!(bearer_token(&headers), Err(Rejection::MalformedHeader), "{bad}");
        }

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Ok("abc.def"));
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler_with_principal() {
        let h = harness();
        let token = h.sessions.issue(&UserId::new("42")).await.unwrap();

        let (status, body) = call(&h.router, Some(&format!("Bearer {token}"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::Value::String("42".to_string()));
        assert_eq!(h.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_header_is_401() {
        let h = harness();
        let (status, body) = call(&h.router, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Authorization header required");
        assert_eq!(body["status"], "error");
        assert_eq!(h.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_header_is_401() {
        let h = harness();
        let (status, body) = call(&h.router, Some("Basic dXNlcjpwYXNz")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid authorization header format");
        assert_eq!(h.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_garbage_token_is_403() {
        let h = harness();
        let (status, body) = call(&h.router, Some("Bearer garbage")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Invalid token");
        assert_eq!(h.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_revoked_token_is_403() {
        let h = harness();
        let user = UserId::new("42");
        let token = h.sessions.issue(&user).await.unwrap();
        h.sessions.invalidate(&user).await.unwrap();

        let (status, _) = call(&h.router, Some(&format!("Bearer {token}"))).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(h.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_401() {
        let h = harness();
        let mut claims = SessionClaims::new(&UserId::new("42"), Duration::from_secs(3600));
        claims.iat -= 7200;
        claims.nbf -= 7200;
        claims.exp = claims.iat + 60;
        let token = TokenCodec::new(SECRET).encode_claims(&claims).unwrap();

        let (status, body) = call(&h.router, Some(&format!("Bearer {token}"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Token has expired");
        assert_eq!(h.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_outage_is_503() {
        let cache = Arc::new(FlakyCache::default());
        let h = harness_with(cache.clone());
        let token = h.sessions.issue(&UserId::new("42")).await.unwrap();
        cache.set_down(true);

        let (status, body) = call(&h.router, Some(&format!("Bearer {token}"))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "Authentication service unavailable");
        assert_eq!(h.hits.load(Ordering::SeqCst), 0);
    }
}

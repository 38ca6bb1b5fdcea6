//! Session issuance, validation and invalidation.
//!
//! A token is accepted only when it verifies cryptographically *and* is
//! byte-for-byte the token recorded under the user's revocation key. One key
//! per user means one live session per user: issuing again supersedes the
//! previous token, and deleting the key logs the user out.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::cache::{CacheError, RevocationCache, revocation_key};
use crate::auth::token::{TokenCodec, TokenError};
use crate::types::UserId;

/// Failures at the session boundary. Codec and cache details stop here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("token has expired")]
    ExpiredToken,

    /// Bad signature, foreign algorithm, garbled, revoked or superseded.
    #[error("invalid token")]
    InvalidToken,

    /// Cache or signer unavailable. Retryable, and never treated as authenticated.
    #[error("session infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<CacheError> for SessionError {
    fn from(err: CacheError) -> Self {
        Self::Infrastructure(err.to_string())
    }
}

pub struct SessionAuthority {
    codec: TokenCodec,
    cache: Arc<dyn RevocationCache>,
    lifetime: Duration,
}

impl SessionAuthority {
    pub fn new(codec: TokenCodec, cache: Arc<dyn RevocationCache>, lifetime: Duration) -> Self {
        Self {
            codec,
            cache,
            lifetime,
        }
    }

    /// Start a session for `user_id`, replacing any session it already has.
    ///
    /// The token is returned only once it has been recorded; if the cache
    /// write fails the caller gets an error and no token.
    pub async fn issue(&self, user_id: &UserId) -> Result<String, SessionError> {
        let token = self
            .codec
            .encode(user_id, self.lifetime)
            .map_err(|e| SessionError::Infrastructure(e.to_string()))?;

        self.cache
            .put(&revocation_key(user_id), &token, self.lifetime)
            .await
            .inspect_err(|e| tracing::error!(user_id = %user_id, error = %e, "failed to record session"))?;

        tracing::debug!(user_id = %user_id, "session issued");
        Ok(token)
    }

    /// Resolve a presented token to its user.
    pub async fn validate(&self, token: &str) -> Result<UserId, SessionError> {
        let claims = self.codec.decode(token).map_err(|e| match e {
            TokenError::Expired => SessionError::ExpiredToken,
            other => {
                tracing::debug!(error = %other, "token failed verification");
                SessionError::InvalidToken
            }
        })?;

        let current = self
            .cache
            .get(&revocation_key(&claims.user_id))
            .await
            .inspect_err(|e| tracing::error!(user_id = %claims.user_id, error = %e, "session lookup failed"))?;

        match current {
            Some(current) if current.as_bytes() == token.as_bytes() => Ok(claims.user_id),
            Some(_) => {
                tracing::debug!(user_id = %claims.user_id, "token superseded by a newer session");
                Err(SessionError::InvalidToken)
            }
            None => {
                tracing::debug!(user_id = %claims.user_id, "no live session for token");
                Err(SessionError::InvalidToken)
            }
        }
    }

    /// End `user_id`'s session. Succeeds when there is none.
    pub async fn invalidate(&self, user_id: &UserId) -> Result<(), SessionError> {
        self.cache
            .delete(&revocation_key(user_id))
            .await
            .inspect_err(|e| tracing::error!(user_id = %user_id, error = %e, "failed to end session"))?;

        tracing::debug!(user_id = %user_id, "session invalidated");
        Ok(())
    }
}

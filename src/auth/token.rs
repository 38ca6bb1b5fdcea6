//! Signed session tokens.
//!
//! Tokens are HS256 JWS compact strings. The codec only proves that a token
//! was minted by this service and has not expired; whether it is still the
//! user's *current* session is decided by [`crate::auth::SessionAuthority`].

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// The only algorithm the codec signs with or accepts.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity the session belongs to
    pub user_id: UserId,
    /// Subject; always the identity rendered as a string
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Not before (unix seconds)
    pub nbf: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
    /// Unique token id, so two sessions minted in the same second differ
    pub jti: String,
}

impl SessionClaims {
    pub fn new(user_id: &UserId, lifetime: Duration) -> Self {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
        Self {
            user_id: user_id.clone(),
            sub: user_id.to_string(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(lifetime),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature checks out but the token is past `exp`.
    #[error("token has expired")]
    Expired,

    /// Anything else: bad signature, foreign algorithm, garbled encoding, missing claims.
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Encodes and verifies session tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "iat", "nbf", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Mint a token for `user_id` that expires after `lifetime`.
    pub fn encode(&self, user_id: &UserId, lifetime: Duration) -> Result<String, TokenError> {
        self.encode_claims(&SessionClaims::new(user_id, lifetime))
    }

    pub(crate) fn encode_claims(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        encode(&Header::new(TOKEN_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm and time window, returning the claims.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        let claims = data.claims;
        if claims.sub != claims.user_id.as_str() {
            return Err(TokenError::Invalid("subject does not match user_id".to_string()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const SECRET: &[u8] = b"test-secret";

    fn day() -> Duration {
        Duration::from_secs(24 * 60 * 60)
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let codec = TokenCodec::new(SECRET);
        let token = codec.encode(&UserId::new("42"), day()).unwrap();

        assert_eq!(token.split('.').count(), 3);

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.user_id, UserId::new("42"));
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iat, claims.nbf);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_tokens_for_same_user_differ() {
        let codec = TokenCodec::new(SECRET);
        let a = codec.encode(&UserId::new("42"), day()).unwrap();
        let b = codec.encode(&UserId::new("42"), day()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = TokenCodec::new(b"other-secret")
            .encode(&UserId::new("42"), day())
            .unwrap();

        let err = TokenCodec::new(SECRET).decode(&token).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn test_expired_token_is_distinct_from_invalid() {
        let codec = TokenCodec::new(SECRET);
        let mut claims = SessionClaims::new(&UserId::new("42"), day());
        claims.iat -= 7200;
        claims.nbf -= 7200;
        claims.exp = Utc::now().timestamp() - 60;
        let token = codec.encode_claims(&claims).unwrap();

        assert_eq!(codec.decode(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_tampered_claims_are_invalid() {
        let codec = TokenCodec::new(SECRET);
        let token = codec.encode(&UserId::new("42"), day()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims["user_id"] = serde_json::json!("1");
        claims["sub"] = serde_json::json!("1");
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(matches!(codec.decode(&forged), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_foreign_algorithm_rejected() {
        let codec = TokenCodec::new(SECRET);
        let claims = SessionClaims::new(&UserId::new("42"), day());
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(codec.decode(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let codec = TokenCodec::new(SECRET);
        let claims = SessionClaims::new(&UserId::new("42"), day());
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let token = format!("{}.{}.", header, payload);

        assert!(matches!(codec.decode(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_garbage_and_mismatched_subject_rejected() {
        let codec = TokenCodec::new(SECRET);
        assert!(matches!(codec.decode("garbage"), Err(TokenError::Invalid(_))));
        assert!(matches!(codec.decode(""), Err(TokenError::Invalid(_))));

        let mut claims = SessionClaims::new(&UserId::new("42"), day());
        claims.sub = "7".to_string();
        let token = codec.encode_claims(&claims).unwrap();
        assert!(matches!(codec.decode(&token), Err(TokenError::Invalid(_))));
    }
}

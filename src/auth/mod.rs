//! Authentication: credentials, session tokens and the request gate.
//!
//! A session is a signed token plus a record of it in the revocation cache.
//! Only the most recently issued token for a user is accepted, and logout
//! removes the record, so a token can stop working well before it expires.
//!
//! ## Flow
//!
//! ```ignore
//! let user = users.authenticate(&email, &password).await?;
//! let token = sessions.issue(&user.user_id).await?;
//!
//! // later, in `require_auth`
//! let user_id = sessions.validate(token).await?;
//!
//! // logout
//! sessions.invalidate(&user_id).await?;
//! ```

pub mod cache;
pub mod context;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;
pub mod user_store;

pub use cache::{
    CacheError, MemoryRevocationCache, RedisRevocationCache, RevocationCache, connect_cache,
    revocation_key,
};
pub use context::Principal;
pub use middleware::require_auth;
pub use session::{SessionAuthority, SessionError};
pub use token::{SessionClaims, TokenCodec, TokenError};
pub use user_store::{CredentialStore, UserStore};

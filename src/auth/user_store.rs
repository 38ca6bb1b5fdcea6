//! Account storage and credential checks.

use async_trait::async_trait;
use std::time::Duration;

use crate::auth::password::{hash_password, verify_password};
use crate::db::schema::{UserCreate, UserRecord};
use crate::db::{Db, StoreError, StoreResult, with_timeout};
use crate::types::UserId;

/// What the authentication layer needs from account storage.
///
/// The session layer never issues queries itself; login and registration go
/// through this seam.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an account by login email.
    async fn lookup_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    /// Check a plaintext password for an existing account.
    ///
    /// Unknown identities verify as `false`.
    async fn verify_password(&self, user_id: &UserId, password: &str) -> StoreResult<bool>;
}

/// User store backed by the `user` table.
#[derive(Clone)]
pub struct UserStore {
    db: Db,
    timeout: Duration,
}

impl UserStore {
    pub fn new(db: Db, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Register a new account.
    ///
    /// Fails with [`StoreError::EmailExists`] when the email is taken.
    pub async fn create_user(&self, input: &UserCreate) -> StoreResult<UserRecord> {
        let email = normalize_email(&input.email);

        if self.get_user_by_email(&email).await?.is_some() {
            return Err(StoreError::EmailExists);
        }

        let password = input.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| StoreError::Database(format!("password hashing task failed: {}", e)))?
            .map_err(|e| StoreError::Database(format!("password hashing failed: {}", e)))?;

        let query = r#"
            CREATE user CONTENT {
                user_id: $user_id,
                email: $email,
                password_hash: $password_hash,
                first_name: $first_name,
                last_name: $last_name,
                created_at: time::now(),
                updated_at: time::now()
            }
        "#;

        let result = with_timeout(
            self.timeout,
            self.db
                .query(query)
                .bind(("user_id", UserId::generate().into_inner()))
                .bind(("email", email))
                .bind(("password_hash", password_hash))
                .bind(("first_name", input.first_name.clone()))
                .bind(("last_name", input.last_name.clone())),
        )
        .await;

        let mut res = result?;
        let users: Vec<UserRecord> = res.take(0).map_err(|e| {
            // A concurrent registration can slip past the lookup above and
            // trip the unique index instead.
            if e.to_string().contains("user_email") {
                StoreError::EmailExists
            } else {
                StoreError::from(e)
            }
        })?;

        users
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Database("failed to create user".to_string()))
    }

    pub async fn get_user_by_id(&self, user_id: &UserId) -> StoreResult<Option<UserRecord>> {
        let query = "SELECT * FROM user WHERE user_id = $user_id LIMIT 1";

        let mut res = with_timeout(
            self.timeout,
            self.db
                .query(query)
                .bind(("user_id", user_id.as_str().to_string())),
        )
        .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    pub async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let query = "SELECT * FROM user WHERE email = $email LIMIT 1";

        let mut res = with_timeout(
            self.timeout,
            self.db.query(query).bind(("email", normalize_email(email))),
        )
        .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Resolve login credentials to an account.
    ///
    /// Returns `None` for an unknown email and for a wrong password alike, so
    /// callers cannot tell the two apart.
    pub async fn authenticate(&self, email: &str, password: &str) -> StoreResult<Option<UserRecord>> {
        let Some(user) = self.lookup_by_email(email).await? else {
            return Ok(None);
        };

        if check_password(password, &user.password_hash).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl CredentialStore for UserStore {
    async fn lookup_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        self.get_user_by_email(email).await
    }

    async fn verify_password(&self, user_id: &UserId, password: &str) -> StoreResult<bool> {
        match self.get_user_by_id(user_id).await? {
            Some(user) => check_password(password, &user.password_hash).await,
            None => Ok(false),
        }
    }
}

/// Argon2 verification off the async workers.
async fn check_password(password: &str, hash: &str) -> StoreResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| StoreError::Database(format!("password check task failed: {}", e)))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

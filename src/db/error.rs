use std::future::IntoFuture;
use std::time::Duration;

/// Errors surfaced by the user and movie stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already exists")]
    EmailExists,

    #[error("record not found")]
    NotFound,

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Run one store round-trip, bounded by `limit`.
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> StoreResult<T>
where
    F: IntoFuture<Output = Result<T, surrealdb::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

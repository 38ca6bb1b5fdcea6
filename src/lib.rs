// Core modules
pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod server;
pub mod types;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use config::{AppConfig, CacheConfig, JwtConfig, ServerConfig};
pub use db::{DatabaseConfig, Db, create_connection, ensure_schema};
pub use server::{build_app, serve};

use anyhow::Result;
use std::sync::Arc;

use auth::{SessionAuthority, TokenCodec, UserStore, connect_cache};
use catalog::MovieStore;

/// Connect every backing service and assemble the shared handler state.
///
/// Fails fast when the database or cache cannot be reached.
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let db = create_connection(&config.database).await?;
    ensure_schema(&db).await?;

    let cache = connect_cache(&config.cache).await?;
    let sessions = SessionAuthority::new(
        TokenCodec::new(config.jwt.secret.as_bytes()),
        cache,
        config.jwt.expiration,
    );

    Ok(AppState {
        sessions: Arc::new(sessions),
        users: UserStore::new(db.clone(), config.database.timeout),
        movies: MovieStore::new(db, config.database.timeout),
    })
}

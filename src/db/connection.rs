use anyhow::Result;
use clap::Args;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// SurrealDB endpoint (`memory`, `rocksdb://...`, `ws://host:port`)
    #[arg(long = "db-url", env = "DATABASE_URL", default_value = "memory")]
    pub url: String,

    #[arg(long = "db-namespace", env = "DATABASE_NAMESPACE", default_value = "movie_catalog")]
    pub namespace: String,

    #[arg(long = "db-name", env = "DATABASE_NAME", default_value = "api")]
    pub database: String,

    #[arg(long = "db-username", env = "DATABASE_USERNAME")]
    pub username: Option<String>,

    #[arg(long = "db-password", env = "DATABASE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Per-query timeout for store round-trips
    #[arg(long = "store-timeout", env = "STORE_TIMEOUT", default_value = "5s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "memory".to_string(),
            namespace: "movie_catalog".to_string(),
            database: "api".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(5),
        }
    }
}

pub async fn create_connection(config: &DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url.as_str()).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        db.signin(Root {
            username: username.as_str(),
            password: password.as_str(),
        })
        .await?;
    }

    db.use_ns(config.namespace.as_str())
        .use_db(config.database.as_str())
        .await?;

    Ok(db)
}

pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = [
        // Registered accounts
        "DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS user_id ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS email ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS password_hash ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS first_name ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS last_name ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE user TYPE datetime;
         DEFINE FIELD IF NOT EXISTS updated_at ON TABLE user TYPE datetime;",

        // Movie catalog
        "DEFINE TABLE IF NOT EXISTS movie SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS movie_id ON TABLE movie TYPE string;
         DEFINE FIELD IF NOT EXISTS title ON TABLE movie TYPE string;
         DEFINE FIELD IF NOT EXISTS description ON TABLE movie TYPE string;
         DEFINE FIELD IF NOT EXISTS release_date ON TABLE movie TYPE datetime;
         DEFINE FIELD IF NOT EXISTS rating ON TABLE movie TYPE number;
         DEFINE FIELD IF NOT EXISTS duration ON TABLE movie TYPE int;
         DEFINE FIELD IF NOT EXISTS genre ON TABLE movie TYPE string;
         DEFINE FIELD IF NOT EXISTS director ON TABLE movie TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE movie TYPE datetime;
         DEFINE FIELD IF NOT EXISTS updated_at ON TABLE movie TYPE datetime;",

        // Indexes
        "DEFINE INDEX IF NOT EXISTS user_email ON TABLE user COLUMNS email UNIQUE;
         DEFINE INDEX IF NOT EXISTS user_user_id ON TABLE user COLUMNS user_id UNIQUE;
         DEFINE INDEX IF NOT EXISTS movie_movie_id ON TABLE movie COLUMNS movie_id UNIQUE;
         DEFINE INDEX IF NOT EXISTS movie_created_at ON TABLE movie COLUMNS created_at;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    Ok(())
}

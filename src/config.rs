//! Process configuration.
//!
//! Every setting is a clap argument backed by an environment variable, so the
//! service can be driven from flags, the environment, or a `.env` file loaded
//! by the binary before parsing.

use clap::Args;
use std::time::Duration;

use crate::db::DatabaseConfig;

/// Signing secret used when `JWT_SECRET` is not provided.
pub const DEFAULT_JWT_SECRET: &str = "default_secret_key";

/// Cache URL that selects the in-process revocation cache.
pub const MEMORY_CACHE_URL: &str = "memory";

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Port for the public HTTP API
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Deployment environment; `production` switches logs to JSON
    #[arg(long = "env", env = "APP_ENV", default_value = "development")]
    pub env: String,

    /// Upper bound on the time spent serving a single request
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "60s", value_parser = humantime::parse_duration)]
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            env: "development".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Connection settings for the revocation cache.
#[derive(Debug, Clone, Args)]
pub struct CacheConfig {
    /// Redis URL, or `memory` for a single-process cache
    #[arg(id = "cache-url", long = "cache-url", env = "CACHE_URL", default_value = "redis://127.0.0.1:6379/0")]
    pub url: String,

    /// Maximum pooled Redis connections
    #[arg(long = "cache-pool-size", env = "CACHE_POOL_SIZE", default_value_t = 16)]
    pub pool_size: usize,

    /// Per-call timeout for cache round-trips
    #[arg(id = "cache-timeout", long = "cache-timeout", env = "CACHE_TIMEOUT", default_value = "2s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,
}

impl CacheConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_CACHE_URL
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: MEMORY_CACHE_URL.to_string(),
            pool_size: 16,
            timeout: Duration::from_secs(2),
        }
    }
}

/// Session token settings.
#[derive(Clone, Args)]
pub struct JwtConfig {
    /// HMAC secret used to sign session tokens
    #[arg(long = "jwt-secret", env = "JWT_SECRET", default_value = DEFAULT_JWT_SECRET, hide_env_values = true)]
    pub secret: String,

    /// Session lifetime, e.g. `24h` or `90m`
    #[arg(long = "jwt-expiration", env = "JWT_EXPIRATION", default_value = "24h", value_parser = humantime::parse_duration)]
    pub expiration: Duration,
}

impl JwtConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_JWT_SECRET
    }
}

// Keep the secret out of debug logs.
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_JWT_SECRET.to_string(),
            expiration: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Complete configuration for `movie-catalog serve`.
#[derive(Debug, Clone, Default, Args)]
pub struct AppConfig {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub cache: CacheConfig,

    #[command(flatten)]
    pub jwt: JwtConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: AppConfig,
    }

    #[test]
    fn test_durations_parse_humantime() {
        let cli = TestCli::try_parse_from([
            "test",
            "--jwt-expiration",
            "90m",
            "--cache-timeout",
            "250ms",
            "--cache-url",
            "memory",
        ])
        .unwrap();

        assert_eq!(cli.config.jwt.expiration, Duration::from_secs(90 * 60));
        assert_eq!(cli.config.cache.timeout, Duration::from_millis(250));
        assert!(cli.config.cache.is_memory());
    }

    #[test]
    fn test_invalid_expiration_rejected() {
        let result = TestCli::try_parse_from(["test", "--jwt-expiration", "tomorrow"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_jwt_debug_redacts_secret() {
        let jwt = JwtConfig {
            secret: "super-secret".to_string(),
            ..Default::default()
        };
        let rendered = format!("{:?}", jwt);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_server_helpers() {
        let server = ServerConfig {
            env: "Production".to_string(),
            ..Default::default()
        };
        assert!(server.is_production());
        assert_eq!(server.bind_addr(), "0.0.0.0:8080");
        assert!(JwtConfig::default().uses_default_secret());
    }
}

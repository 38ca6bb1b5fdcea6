use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use movie_catalog::{AppConfig, DatabaseConfig, build_state, create_connection, ensure_schema, serve};

#[derive(Parser)]
#[command(name = "movie-catalog")]
#[command(about = "Movie catalog JSON API with revocable session tokens")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        #[command(flatten)]
        config: AppConfig,
        /// Emit logs as JSON lines (implied when APP_ENV=production)
        #[arg(long, env = "LOG_JSON", default_value_t = false)]
        log_json: bool,
    },
    /// Initialize the database schema and exit
    Init {
        #[command(flatten)]
        database: DatabaseConfig,
    },
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive("movie_catalog=info".parse()?)
        .add_directive("surrealdb=warn".parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before clap reads env-backed arguments
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, log_json } => {
            init_tracing(log_json || config.server.is_production())?;
            if dotenv.is_err() {
                warn!("no .env file found, using environment variables");
            }

            if config.jwt.uses_default_secret() {
                warn!("JWT_SECRET is not set; signing tokens with the built-in default secret");
            }

            info!(
                env = %config.server.env,
                db_url = %config.database.url,
                token_lifetime = %humantime::format_duration(config.jwt.expiration),
                "starting movie catalog"
            );

            let state = build_state(&config).await?;
            serve(state, &config.server).await?;
        }
        Commands::Init { database } => {
            init_tracing(false)?;
            if dotenv.is_err() {
                warn!("no .env file found, using environment variables");
            }

            info!(db_url = %database.url, "initializing database");
            let db = create_connection(&database).await?;
            ensure_schema(&db).await?;
            info!("database initialized");
        }
    }

    Ok(())
}

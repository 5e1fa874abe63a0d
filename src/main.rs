// src/main.rs

use std::{net::SocketAddr, sync::Arc};

use blog_backend::{
    config::{Config, StorageBackend},
    routes,
    state::AppState,
    storage::{MemoryStore, PgStore},
    utils::{hash::Argon2Credentials, jwt::JwtTokens},
};
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let tokens = Arc::new(JwtTokens::new(config.jwt_secret.clone(), config.jwt_expiration));
    let credentials = Arc::new(Argon2Credentials);

    let state = match config.storage {
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config.database).await?;
            AppState::new(Arc::new(store), tokens, credentials)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data will not survive a restart");
            AppState::new(Arc::new(MemoryStore::new()), tokens, credentials)
        }
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}

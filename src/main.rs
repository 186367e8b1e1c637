use sportsboard::{
    build_router, AppConfig, AppState, EventBus, GameRecordStore, InMemoryGameRecordStore,
    PostgresGameRecordStore,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the process environment is used as is
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sportsboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting sports statistics server");

    let config = AppConfig::from_env()?;

    let store: Arc<dyn GameRecordStore> = match &config.database_url {
        Some(database_url) => {
            // Lazy pool: the server starts and serves fallback data while the database is down
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(config.db_acquire_timeout)
                .connect_lazy(database_url)?;
            info!(
                max_connections = config.db_max_connections,
                "Using PostgreSQL game record store"
            );
            Arc::new(PostgresGameRecordStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory game record store");
            Arc::new(InMemoryGameRecordStore::new())
        }
    };

    let app_state = AppState::new(store, EventBus::new());
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}

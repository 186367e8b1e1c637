// Library crate for the sports statistics service
// This file exposes the public API for integration tests

pub mod config;
pub mod event;
pub mod shared;
pub mod stats;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use stats::types::ApiResponse;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types for easier access in tests
pub use config::{AppConfig, ConfigError};
pub use event::{EventBus, StatsEvent, StatsEventSink};
pub use shared::{AppError, AppState};
pub use stats::{
    FallbackProvider, GameRecordStore, HistoryProjector, InMemoryGameRecordStore,
    IngestionService, PostgresGameRecordStore, RollupMaintainer, StatAggregator, StatsError,
};

async fn health() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::new("Server is healthy", json!({ "status": "ok" })))
}

/// Full HTTP surface with tracing and permissive CORS
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(stats::handlers::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::event::EventBus;
use crate::stats::{
    FallbackProvider, GameRecordStore, HistoryProjector, IngestionService, RollupMaintainer,
    StatAggregator, StatsError,
};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub aggregator: StatAggregator,
    pub history: HistoryProjector,
    pub rollup: RollupMaintainer,
    pub ingestion: Arc<IngestionService>,
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires every statistics service over one store; write paths publish to `event_bus`
    pub fn new(store: Arc<dyn GameRecordStore>, event_bus: EventBus) -> Self {
        let fallback = FallbackProvider::new();
        let rollup = RollupMaintainer::new(Arc::clone(&store));
        let ingestion = IngestionService::builder(Arc::clone(&store), rollup.clone())
            .with_event_sink(Arc::new(event_bus.clone()))
            .build();

        Self {
            aggregator: StatAggregator::new(Arc::clone(&store), fallback),
            history: HistoryProjector::new(store, fallback),
            rollup,
            ingestion: Arc::new(ingestion),
            event_bus,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::NotFound(msg) => AppError::NotFound(msg),
            StatsError::Validation(msg) => AppError::Conflict(msg),
            StatsError::InvalidInput(msg) => AppError::BadRequest(msg),
            StatsError::Ingestion(msg) => AppError::Unprocessable(msg),
            StatsError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Store unavailable: {}", msg),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    /// The store could not be reached or a query failed (includes pool timeouts).
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The request conflicts with the current state (e.g. a game already final).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A batch write was rejected and rolled back as a whole.
    #[error("Ingestion failed: {0}")]
    Ingestion(String),
}

impl From<sqlx::Error> for StatsError {
    fn from(err: sqlx::Error) -> Self {
        StatsError::StoreUnavailable(err.to_string())
    }
}

pub mod aggregator;
pub mod calculators;
pub mod fallback;
pub mod handlers;
pub mod history;
pub mod ingest;
pub mod postgres;
pub mod repository;
pub mod rollup;
pub mod types;

mod errors;
pub mod models;

pub use aggregator::StatAggregator;
pub use errors::StatsError;
pub use fallback::{live_or_fallback, FallbackProvider};
pub use history::HistoryProjector;
pub use ingest::{IngestionService, IngestionServiceBuilder};
pub use models::*;
pub use postgres::PostgresGameRecordStore;
pub use repository::{GameRecordStore, InMemoryGameRecordStore};
pub use rollup::RollupMaintainer;

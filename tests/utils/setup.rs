use std::sync::Arc;

use sportsboard::stats::{
    FallbackProvider, GameRecordStore, HistoryProjector, IngestionService, RollupMaintainer,
    StatAggregator,
};

use super::mocks::RecordingEventSink;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub store: Arc<dyn GameRecordStore>,
    pub aggregator: StatAggregator,
    pub history: HistoryProjector,
    pub rollup: RollupMaintainer,
    pub ingestion: IngestionService,
    pub events: RecordingEventSink,
}

impl TestSetup {
    pub fn new(store: Arc<dyn GameRecordStore>) -> Self {
        let events = RecordingEventSink::new();
        let rollup = RollupMaintainer::new(Arc::clone(&store));
        let ingestion = IngestionService::builder(Arc::clone(&store), rollup.clone())
            .with_event_sink(Arc::new(events.clone()))
            .build();

        Self {
            aggregator: StatAggregator::new(Arc::clone(&store), FallbackProvider::new()),
            history: HistoryProjector::new(Arc::clone(&store), FallbackProvider::new()),
            rollup,
            ingestion,
            events,
            store,
        }
    }
}

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use sportsboard::{
    event::{StatsEvent, StatsEventSink},
    stats::{
        GameRecord, GameRecordStore, GameStatRecord, IngestionBatch, PlayerGameLine,
        PlayerRecord, PlayerStatLine, StatsError, TeamRecord, UserStatistics,
    },
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Store that behaves like an unreachable database
pub struct UnreachableStore;

fn refused<T>() -> Result<T, StatsError> {
    Err(StatsError::StoreUnavailable("connection refused".to_string()))
}

#[async_trait]
impl GameRecordStore for UnreachableStore {
    async fn list_players(&self) -> Result<Vec<PlayerRecord>, StatsError> {
        refused()
    }
    async fn find_player(&self, _user_id: &str) -> Result<Option<PlayerRecord>, StatsError> {
        refused()
    }
    async fn list_teams(&self) -> Result<Vec<TeamRecord>, StatsError> {
        refused()
    }
    async fn find_team(&self, _team_id: i32) -> Result<Option<TeamRecord>, StatsError> {
        refused()
    }
    async fn find_game(&self, _game_id: i32) -> Result<Option<GameRecord>, StatsError> {
        refused()
    }
    async fn list_games(&self, _season: Option<i32>) -> Result<Vec<GameRecord>, StatsError> {
        refused()
    }
    async fn list_game_stats(
        &self,
        _season: Option<i32>,
    ) -> Result<Vec<GameStatRecord>, StatsError> {
        refused()
    }
    async fn list_player_game_lines(
        &self,
        _user_id: &str,
        _season: Option<i32>,
    ) -> Result<Vec<PlayerGameLine>, StatsError> {
        refused()
    }
    async fn list_game_lines(&self, _game_id: i32) -> Result<Vec<PlayerStatLine>, StatsError> {
        refused()
    }
    async fn get_user_statistics(
        &self,
        _user_id: &str,
    ) -> Result<Vec<UserStatistics>, StatsError> {
        refused()
    }
    async fn replace_user_statistics(
        &self,
        _user_id: &str,
        _rollups: &[UserStatistics],
    ) -> Result<(), StatsError> {
        refused()
    }
    async fn ingest(&self, _batch: &IngestionBatch) -> Result<(), StatsError> {
        refused()
    }
    async fn complete_game(
        &self,
        _game_id: i32,
        _home_score: i32,
        _away_score: i32,
    ) -> Result<Option<GameRecord>, StatsError> {
        refused()
    }
}

/// Event sink that keeps every published event for inspection
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<RwLock<Vec<StatsEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<StatsEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl StatsEventSink for RecordingEventSink {
    async fn publish(&self, event: StatsEvent) {
        self.events.write().await.push(event);
    }
}

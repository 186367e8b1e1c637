use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    repository::GameRecordStore, rollup::RollupMaintainer, GameRecord, GameStatRecord, GameStatus,
    IngestionBatch, IngestionReceipt, StatsError,
};
use crate::event::{StatsEvent, StatsEventSink};

pub const MAX_MINUTES_PLAYED: i32 = 150;
/// Upper bound for a per-game counter (goals, assists, cards)
pub const MAX_GAME_COUNTER: i32 = 99;
/// Upper bound for one side's final score
pub const MAX_SCORE: i32 = 999;

/// Write path: bulk ingestion and result finalization, followed by rollup refresh
pub struct IngestionService {
    store: Arc<dyn GameRecordStore>,
    rollup: RollupMaintainer,
    event_sink: Option<Arc<dyn StatsEventSink>>,
}

impl IngestionService {
    pub fn builder(store: Arc<dyn GameRecordStore>, rollup: RollupMaintainer) -> IngestionServiceBuilder {
        IngestionServiceBuilder::new(store, rollup)
    }

    /// Validates and writes the batch in one transaction, then recomputes every affected user.
    ///
    /// Any invalid row rejects the whole batch with `StatsError::Ingestion`. Once the
    /// batch is committed the call succeeds; users whose rollup refresh failed are
    /// listed in `IngestionReceipt::stale_users` and can be recomputed later.
    #[instrument(skip(self, batch), fields(games = batch.games.len(), game_stats = batch.game_stats.len()))]
    pub async fn ingest(&self, batch: IngestionBatch) -> Result<IngestionReceipt, StatsError> {
        validate_batch(&batch)?;

        self.store.ingest(&batch).await?;

        let mut affected: BTreeSet<String> =
            batch.game_stats.iter().map(|s| s.user_id.clone()).collect();
        // Upserted games may have moved season, which shifts rows already stored
        for game in &batch.games {
            match self.store.list_game_lines(game.game_id).await {
                Ok(lines) => affected.extend(lines.into_iter().map(|line| line.stat.user_id)),
                Err(err) => {
                    warn!(game_id = game.game_id, error = %err, "Could not load stored lines of upserted game")
                }
            }
        }

        let refresh = self.refresh_users(&affected).await;

        for game in batch.games.iter().filter(|g| g.status.is_completed()) {
            self.publish(score_event(game)).await;
        }

        info!(
            games = batch.games.len(),
            game_stats = batch.game_stats.len(),
            users_refreshed = refresh.refreshed,
            stale_users = refresh.stale.len(),
            "Batch ingested"
        );

        Ok(IngestionReceipt {
            games_written: batch.games.len(),
            game_stats_written: batch.game_stats.len(),
            users_refreshed: refresh.refreshed,
            stale_users: refresh.stale,
        })
    }

    /// Records the final score of a scheduled or in-progress game and refreshes its players.
    ///
    /// The result is committed before the refresh; a failed refresh is logged and
    /// leaves those rollups stale.
    #[instrument(skip(self))]
    pub async fn finalize_game(
        &self,
        game_id: i32,
        home_score: i32,
        away_score: i32,
    ) -> Result<GameRecord, StatsError> {
        if !score_in_range(home_score) || !score_in_range(away_score) {
            return Err(StatsError::InvalidInput(format!(
                "scores must be between 0 and {}, got {}-{}",
                MAX_SCORE, home_score, away_score
            )));
        }

        let game = self
            .store
            .find_game(game_id)
            .await?
            .ok_or_else(|| StatsError::NotFound(format!("game {}", game_id)))?;

        if !game.status.can_transition_to(GameStatus::Completed) {
            warn!(game_id, status = %game.status, "Rejected result for game in final state");
            return Err(StatsError::Validation(format!(
                "game {} is {} and cannot be completed",
                game_id, game.status
            )));
        }

        let updated = self
            .store
            .complete_game(game_id, home_score, away_score)
            .await?
            .ok_or_else(|| StatsError::NotFound(format!("game {}", game_id)))?;

        self.publish(score_event(&updated)).await;

        match self.store.list_game_lines(game_id).await {
            Ok(lines) => {
                let players: BTreeSet<String> =
                    lines.into_iter().map(|line| line.stat.user_id).collect();
                let refresh = self.refresh_users(&players).await;
                debug!(
                    game_id,
                    home_score,
                    away_score,
                    refreshed = refresh.refreshed,
                    stale = refresh.stale.len(),
                    "Game finalized"
                );
            }
            Err(err) => {
                warn!(game_id, error = %err, "Game finalized but its players could not be loaded for refresh");
            }
        }

        Ok(updated)
    }

    /// Recomputes each user independently so one failure does not block the rest
    async fn refresh_users(&self, user_ids: &BTreeSet<String>) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();
        for user_id in user_ids {
            match self.rollup.recompute_user_statistics(user_id).await {
                Ok(_) => {
                    outcome.refreshed += 1;
                    self.publish(StatsEvent::UserStatisticsRefreshed {
                        user_id: user_id.clone(),
                    })
                    .await;
                }
                Err(err) => {
                    warn!(user_id = %user_id, error = %err, "Rollup refresh failed after commit");
                    outcome.stale.push(user_id.clone());
                }
            }
        }
        outcome
    }

    async fn publish(&self, event: StatsEvent) {
        if let Some(sink) = &self.event_sink {
            sink.publish(event).await;
        }
    }
}

#[derive(Debug, Default)]
struct RefreshOutcome {
    refreshed: usize,
    stale: Vec<String>,
}

fn score_in_range(score: i32) -> bool {
    (0..=MAX_SCORE).contains(&score)
}

fn score_event(game: &GameRecord) -> StatsEvent {
    StatsEvent::GameScoreUpdated {
        game_id: game.game_id,
        home_score: game.home_score,
        away_score: game.away_score,
        status: game.status,
    }
}

fn validate_batch(batch: &IngestionBatch) -> Result<(), StatsError> {
    for game in &batch.games {
        if !score_in_range(game.home_score) || !score_in_range(game.away_score) {
            return Err(StatsError::Ingestion(format!(
                "game {} score must be between 0 and {}",
                game.game_id, MAX_SCORE
            )));
        }
    }
    for stat in &batch.game_stats {
        validate_stat(stat)?;
    }
    Ok(())
}

fn validate_stat(stat: &GameStatRecord) -> Result<(), StatsError> {
    let counters = [
        ("goals", stat.goals, MAX_GAME_COUNTER),
        ("assists", stat.assists, MAX_GAME_COUNTER),
        ("yellow_cards", stat.yellow_cards, MAX_GAME_COUNTER),
        ("red_cards", stat.red_cards, MAX_GAME_COUNTER),
        ("minutes_played", stat.minutes_played, MAX_MINUTES_PLAYED),
    ];
    match counters.iter().find(|(_, value, max)| !(0..=*max).contains(value)) {
        Some((field, value, max)) => Err(StatsError::Ingestion(format!(
            "{} for user {} in game {} must be between 0 and {} ({})",
            field, stat.user_id, stat.game_id, max, value
        ))),
        None => Ok(()),
    }
}

pub struct IngestionServiceBuilder {
    store: Arc<dyn GameRecordStore>,
    rollup: RollupMaintainer,
    event_sink: Option<Arc<dyn StatsEventSink>>,
}

impl IngestionServiceBuilder {
    pub fn new(store: Arc<dyn GameRecordStore>, rollup: RollupMaintainer) -> Self {
        Self {
            store,
            rollup,
            event_sink: None,
        }
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn StatsEventSink>) -> Self {
        self.event_sink = Some(event_sink);
        self
    }

    pub fn build(self) -> IngestionService {
        IngestionService {
            store: self.store,
            rollup: self.rollup,
            event_sink: self.event_sink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBus;
    use crate::shared::test_utils::{
        fixture_store, game_record, stat_record, FlakyGameRecordStore,
    };
    use crate::stats::{FallbackProvider, InMemoryGameRecordStore, StatAggregator};

    fn service(store: Arc<InMemoryGameRecordStore>) -> IngestionService {
        IngestionService::builder(store.clone(), RollupMaintainer::new(store)).build()
    }

    #[tokio::test]
    async fn ingest_writes_rows_and_refreshes_users() {
        let store = Arc::new(fixture_store());
        let service = service(store.clone());
        let batch = IngestionBatch {
            games: vec![game_record(5, 2025, 1, 3, GameStatus::Completed, (2, 0))],
            game_stats: vec![stat_record(5, "user1", 2, 0), stat_record(5, "user4", 0, 0)],
        };

        let receipt = service.ingest(batch).await.unwrap();

        assert_eq!(receipt.games_written, 1);
        assert_eq!(receipt.game_stats_written, 2);
        assert_eq!(receipt.users_refreshed, 2);
        assert!(receipt.stale_users.is_empty());
        let rollups = store.get_user_statistics("user1").await.unwrap();
        let season = rollups.iter().find(|r| r.season == 2025).unwrap();
        assert_eq!(season.games_played, 3);
        assert_eq!(season.total_goals, 5);
    }

    #[tokio::test]
    async fn invalid_counters_reject_the_batch() {
        let store = Arc::new(fixture_store());
        let service = service(store.clone());
        let mut too_long = stat_record(1, "user1", 0, 0);
        too_long.minutes_played = MAX_MINUTES_PLAYED + 1;
        let mut negative = stat_record(2, "user2", 0, 0);
        negative.assists = -1;

        for bad in [too_long, negative] {
            let batch = IngestionBatch {
                games: vec![],
                game_stats: vec![stat_record(2, "user4", 9, 0), bad],
            };
            let result = service.ingest(batch).await;
            assert!(matches!(result, Err(StatsError::Ingestion(_))));
        }

        let lines = store.list_game_lines(2).await.unwrap();
        let user4 = lines.iter().find(|l| l.stat.user_id == "user4").unwrap();
        assert_eq!(user4.stat.goals, 1);
    }

    #[tokio::test]
    async fn oversized_counters_are_rejected_before_they_reach_totals() {
        let store = Arc::new(fixture_store());
        let service = service(store.clone());
        let mut red_cards = stat_record(2, "user2", 0, 0);
        red_cards.red_cards = MAX_GAME_COUNTER + 1;

        let batches = [
            IngestionBatch {
                games: vec![],
                game_stats: vec![stat_record(1, "user1", i32::MAX, 0), stat_record(2, "user1", 1, 0)],
            },
            IngestionBatch {
                games: vec![],
                game_stats: vec![red_cards],
            },
            IngestionBatch {
                games: vec![game_record(5, 2025, 1, 2, GameStatus::Completed, (i32::MAX, 1))],
                game_stats: vec![],
            },
        ];
        for batch in batches {
            let result = service.ingest(batch).await;
            assert!(matches!(result, Err(StatsError::Ingestion(_))));
        }

        let scorers = StatAggregator::new(store, FallbackProvider::new())
            .get_top_scorers(10, None)
            .await;
        assert_eq!(scorers[0].user_id, "user1");
        assert_eq!(scorers[0].goals, 4);
    }

    #[tokio::test]
    async fn committed_batch_reports_users_left_stale() {
        let store = Arc::new(FlakyGameRecordStore::new(
            fixture_store(),
            &["replace_user_statistics"],
        ));
        let events = EventBus::new();
        let mut user_events = events.subscribe("user:user1").await;
        let service = IngestionService::builder(store.clone(), RollupMaintainer::new(store.clone()))
            .with_event_sink(Arc::new(events.clone()))
            .build();
        let batch = IngestionBatch {
            games: vec![game_record(5, 2025, 1, 3, GameStatus::Completed, (2, 0))],
            game_stats: vec![stat_record(5, "user1", 2, 0)],
        };

        let receipt = service.ingest(batch).await.unwrap();

        assert_eq!(receipt.game_stats_written, 1);
        assert_eq!(receipt.users_refreshed, 0);
        assert_eq!(receipt.stale_users, vec!["user1".to_string()]);
        let lines = store.list_game_lines(5).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(user_events.try_recv().is_err());
    }

    #[tokio::test]
    async fn finalize_game_completes_and_publishes() {
        let store = Arc::new(fixture_store());
        let bus = EventBus::new();
        let mut game_events = bus.subscribe("game:4").await;
        let service = IngestionService::builder(store.clone(), RollupMaintainer::new(store.clone()))
            .with_event_sink(Arc::new(bus.clone()))
            .build();

        let game = service.finalize_game(4, 2, 2).await.unwrap();

        assert_eq!(game.status, GameStatus::Completed);
        assert_eq!(
            game_events.recv().await.unwrap(),
            StatsEvent::GameScoreUpdated {
                game_id: 4,
                home_score: 2,
                away_score: 2,
                status: GameStatus::Completed,
            }
        );
    }

    #[tokio::test]
    async fn finalize_game_rejects_invalid_requests() {
        let service = service(Arc::new(fixture_store()));

        assert!(matches!(
            service.finalize_game(99, 1, 0).await,
            Err(StatsError::NotFound(_))
        ));
        assert!(matches!(
            service.finalize_game(1, 1, 0).await,
            Err(StatsError::Validation(_))
        ));
        assert!(matches!(
            service.finalize_game(4, -1, 0).await,
            Err(StatsError::InvalidInput(_))
        ));
        assert!(matches!(
            service.finalize_game(4, 0, MAX_SCORE + 1).await,
            Err(StatsError::InvalidInput(_))
        ));
    }
}

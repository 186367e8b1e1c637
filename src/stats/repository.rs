use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{
    GameRecord, GameStatRecord, GameStatus, IngestionBatch, PlayerGameLine, PlayerRecord,
    PlayerStatLine, StatsError, TeamRecord, UserStatistics,
};

/// Query contracts the statistics core issues against the game record store.
///
/// Every read returns typed records; ordering is applied by the callers.
/// Any failure (connection, timeout, decode) surfaces as `StatsError::StoreUnavailable`.
#[async_trait]
pub trait GameRecordStore: Send + Sync {
    async fn list_players(&self) -> Result<Vec<PlayerRecord>, StatsError>;
    async fn find_player(&self, user_id: &str) -> Result<Option<PlayerRecord>, StatsError>;
    async fn list_teams(&self) -> Result<Vec<TeamRecord>, StatsError>;
    async fn find_team(&self, team_id: i32) -> Result<Option<TeamRecord>, StatsError>;
    async fn find_game(&self, game_id: i32) -> Result<Option<GameRecord>, StatsError>;
    async fn list_games(&self, season: Option<i32>) -> Result<Vec<GameRecord>, StatsError>;

    /// Stat rows restricted to games of `season` (all games when `None`)
    async fn list_game_stats(&self, season: Option<i32>)
        -> Result<Vec<GameStatRecord>, StatsError>;

    async fn list_player_game_lines(
        &self,
        user_id: &str,
        season: Option<i32>,
    ) -> Result<Vec<PlayerGameLine>, StatsError>;

    async fn list_game_lines(&self, game_id: i32) -> Result<Vec<PlayerStatLine>, StatsError>;

    async fn get_user_statistics(&self, user_id: &str)
        -> Result<Vec<UserStatistics>, StatsError>;

    /// Replaces every rollup row of the user with `rollups`
    async fn replace_user_statistics(
        &self,
        user_id: &str,
        rollups: &[UserStatistics],
    ) -> Result<(), StatsError>;

    /// Writes the batch atomically: either every row lands or none does
    async fn ingest(&self, batch: &IngestionBatch) -> Result<(), StatsError>;

    /// Sets status `completed` and the final score; `None` when the game does not exist
    async fn complete_game(
        &self,
        game_id: i32,
        home_score: i32,
        away_score: i32,
    ) -> Result<Option<GameRecord>, StatsError>;
}

#[derive(Debug, Default)]
struct StoreState {
    players: HashMap<String, PlayerRecord>,
    teams: BTreeMap<i32, TeamRecord>,
    games: BTreeMap<i32, GameRecord>,
    game_stats: BTreeMap<(i32, String), GameStatRecord>,
    rollups: BTreeMap<(String, i32), UserStatistics>,
}

/// In-memory implementation of GameRecordStore for development and testing
#[derive(Debug, Default)]
pub struct InMemoryGameRecordStore {
    state: RwLock<StoreState>,
}

impl InMemoryGameRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with records; stat rows upsert on (game, user)
    pub fn with_records(
        players: Vec<PlayerRecord>,
        teams: Vec<TeamRecord>,
        games: Vec<GameRecord>,
        game_stats: Vec<GameStatRecord>,
    ) -> Self {
        let state = StoreState {
            players: players
                .into_iter()
                .map(|p| (p.user_id.clone(), p))
                .collect(),
            teams: teams.into_iter().map(|t| (t.team_id, t)).collect(),
            games: games.into_iter().map(|g| (g.game_id, g)).collect(),
            game_stats: game_stats
                .into_iter()
                .map(|s| ((s.game_id, s.user_id.clone()), s))
                .collect(),
            rollups: BTreeMap::new(),
        };

        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn game_stat_count(&self) -> usize {
        self.state.read().await.game_stats.len()
    }

    pub async fn game_count(&self) -> usize {
        self.state.read().await.games.len()
    }
}

#[async_trait]
impl GameRecordStore for InMemoryGameRecordStore {
    async fn list_players(&self) -> Result<Vec<PlayerRecord>, StatsError> {
        let state = self.state.read().await;
        Ok(state.players.values().cloned().collect())
    }

    async fn find_player(&self, user_id: &str) -> Result<Option<PlayerRecord>, StatsError> {
        let state = self.state.read().await;
        Ok(state.players.get(user_id).cloned())
    }

    async fn list_teams(&self) -> Result<Vec<TeamRecord>, StatsError> {
        let state = self.state.read().await;
        Ok(state.teams.values().cloned().collect())
    }

    async fn find_team(&self, team_id: i32) -> Result<Option<TeamRecord>, StatsError> {
        let state = self.state.read().await;
        Ok(state.teams.get(&team_id).cloned())
    }

    async fn find_game(&self, game_id: i32) -> Result<Option<GameRecord>, StatsError> {
        let state = self.state.read().await;
        Ok(state.games.get(&game_id).cloned())
    }

    async fn list_games(&self, season: Option<i32>) -> Result<Vec<GameRecord>, StatsError> {
        let state = self.state.read().await;
        Ok(state
            .games
            .values()
            .filter(|g| g.in_season(season))
            .cloned()
            .collect())
    }

    async fn list_game_stats(
        &self,
        season: Option<i32>,
    ) -> Result<Vec<GameStatRecord>, StatsError> {
        let state = self.state.read().await;
        Ok(state
            .game_stats
            .values()
            .filter(|s| {
                state
                    .games
                    .get(&s.game_id)
                    .is_some_and(|g| g.in_season(season))
            })
            .cloned()
            .collect())
    }

    async fn list_player_game_lines(
        &self,
        user_id: &str,
        season: Option<i32>,
    ) -> Result<Vec<PlayerGameLine>, StatsError> {
        let state = self.state.read().await;
        Ok(state
            .game_stats
            .values()
            .filter(|s| s.user_id == user_id)
            .filter_map(|s| {
                let game = state.games.get(&s.game_id)?;
                game.in_season(season).then(|| PlayerGameLine {
                    stat: s.clone(),
                    game: game.clone(),
                })
            })
            .collect())
    }

    async fn list_game_lines(&self, game_id: i32) -> Result<Vec<PlayerStatLine>, StatsError> {
        let state = self.state.read().await;
        Ok(state
            .game_stats
            .values()
            .filter(|s| s.game_id == game_id)
            .filter_map(|s| {
                let player = state.players.get(&s.user_id)?;
                Some(PlayerStatLine {
                    player: player.clone(),
                    stat: s.clone(),
                })
            })
            .collect())
    }

    async fn get_user_statistics(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserStatistics>, StatsError> {
        let state = self.state.read().await;
        Ok(state
            .rollups
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, rollups))]
    async fn replace_user_statistics(
        &self,
        user_id: &str,
        rollups: &[UserStatistics],
    ) -> Result<(), StatsError> {
        let mut state = self.state.write().await;
        state.rollups.retain(|(owner, _), _| owner != user_id);
        for rollup in rollups {
            state
                .rollups
                .insert((user_id.to_string(), rollup.season), rollup.clone());
        }

        debug!(user_id = %user_id, seasons = rollups.len(), "Rollups replaced in memory");
        Ok(())
    }

    #[instrument(skip(self, batch))]
    async fn ingest(&self, batch: &IngestionBatch) -> Result<(), StatsError> {
        let mut state = self.state.write().await;

        // Check every reference before touching the state so a rejection leaves it untouched
        for game in &batch.games {
            for team_id in [game.home_team_id, game.away_team_id].into_iter().flatten() {
                if !state.teams.contains_key(&team_id) {
                    warn!(game_id = game.game_id, team_id, "Ingested game references unknown team");
                    return Err(StatsError::Ingestion(format!(
                        "game {} references unknown team {}",
                        game.game_id, team_id
                    )));
                }
            }
        }

        let batch_games: HashSet<i32> = batch.games.iter().map(|g| g.game_id).collect();
        for stat in &batch.game_stats {
            if !batch_games.contains(&stat.game_id) && !state.games.contains_key(&stat.game_id) {
                warn!(game_id = stat.game_id, "Ingested stat references unknown game");
                return Err(StatsError::Ingestion(format!(
                    "stat row references unknown game {}",
                    stat.game_id
                )));
            }
            if !state.players.contains_key(&stat.user_id) {
                warn!(user_id = %stat.user_id, "Ingested stat references unknown user");
                return Err(StatsError::Ingestion(format!(
                    "stat row references unknown user {}",
                    stat.user_id
                )));
            }
        }

        for game in &batch.games {
            state.games.insert(game.game_id, game.clone());
        }
        for stat in &batch.game_stats {
            state
                .game_stats
                .insert((stat.game_id, stat.user_id.clone()), stat.clone());
        }

        debug!(
            games = batch.games.len(),
            game_stats = batch.game_stats.len(),
            "Batch ingested in memory"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn complete_game(
        &self,
        game_id: i32,
        home_score: i32,
        away_score: i32,
    ) -> Result<Option<GameRecord>, StatsError> {
        let mut state = self.state.write().await;
        let Some(game) = state.games.get_mut(&game_id) else {
            debug!(game_id, "Game not found in memory");
            return Ok(None);
        };

        game.status = GameStatus::Completed;
        game.home_score = home_score;
        game.away_score = away_score;
        Ok(Some(game.clone()))
    }
}

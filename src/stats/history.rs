use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    fallback::{live_or_fallback, FallbackProvider},
    repository::GameRecordStore,
    BoxScore, GameHistoryEntry, GameStatLine, PlayerPerformance, PlayerStatLine, StatsError,
};

/// Per-game views: a player's recent games and a single game's stat sheet
#[derive(Clone)]
pub struct HistoryProjector {
    store: Arc<dyn GameRecordStore>,
    fallback: FallbackProvider,
}

impl HistoryProjector {
    pub fn new(store: Arc<dyn GameRecordStore>, fallback: FallbackProvider) -> Self {
        Self { store, fallback }
    }

    /// Newest game first, at most `limit` entries
    #[instrument(skip(self))]
    pub async fn get_player_game_history(
        &self,
        player_id: &str,
        limit: usize,
    ) -> Vec<GameHistoryEntry> {
        live_or_fallback(
            "player_game_history",
            self.live_player_game_history(player_id, limit),
            || self.fallback.player_game_history(),
        )
        .await
    }

    /// Every stat line of the game, goals desc then assists desc
    #[instrument(skip(self))]
    pub async fn get_game_stats(&self, game_id: i32) -> Vec<GameStatLine> {
        live_or_fallback("game_stats", self.live_game_stats(game_id), || {
            self.fallback.game_stats()
        })
        .await
    }

    /// The game header with its stat lines split by side; `None` for an unknown game
    #[instrument(skip(self))]
    pub async fn get_box_score(&self, game_id: i32) -> Option<BoxScore> {
        live_or_fallback("box_score", self.live_box_score(game_id), || {
            self.fallback.box_score()
        })
        .await
    }

    async fn live_player_game_history(
        &self,
        player_id: &str,
        limit: usize,
    ) -> Result<Vec<GameHistoryEntry>, StatsError> {
        let mut lines = self.store.list_player_game_lines(player_id, None).await?;
        lines.sort_by(|a, b| {
            b.game
                .game_date
                .cmp(&a.game.game_date)
                .then(b.game.game_id.cmp(&a.game.game_id))
        });

        debug!(player_id = %player_id, games = lines.len(), "Loaded player game lines");

        Ok(lines
            .into_iter()
            .take(limit)
            .map(|line| GameHistoryEntry {
                game_id: line.game.game_id,
                title: line.game.title,
                game_date: line.game.game_date,
                venue: line.game.venue,
                status: line.game.status,
                home_team: line.game.home_team_name,
                away_team: line.game.away_team_name,
                home_score: line.game.home_score,
                away_score: line.game.away_score,
                player_performance: PlayerPerformance {
                    goals: line.stat.goals,
                    assists: line.stat.assists,
                    yellow_cards: line.stat.yellow_cards,
                    red_cards: line.stat.red_cards,
                    minutes_played: line.stat.minutes_played,
                },
            })
            .collect())
    }

    async fn sorted_game_lines(&self, game_id: i32) -> Result<Vec<PlayerStatLine>, StatsError> {
        let mut lines = self.store.list_game_lines(game_id).await?;
        lines.sort_by(|a, b| {
            b.stat
                .goals
                .cmp(&a.stat.goals)
                .then(b.stat.assists.cmp(&a.stat.assists))
                .then_with(|| a.player.user_name.cmp(&b.player.user_name))
                .then_with(|| a.player.user_id.cmp(&b.player.user_id))
        });
        Ok(lines)
    }

    async fn live_game_stats(&self, game_id: i32) -> Result<Vec<GameStatLine>, StatsError> {
        let lines = self.sorted_game_lines(game_id).await?;
        Ok(lines.into_iter().map(stat_line).collect())
    }

    async fn live_box_score(&self, game_id: i32) -> Result<Option<BoxScore>, StatsError> {
        let Some(game) = self.store.find_game(game_id).await? else {
            debug!(game_id, "Game not found for box score");
            return Ok(None);
        };

        let mut home_players = Vec::new();
        let mut away_players = Vec::new();
        let mut unassigned_players = Vec::new();

        for line in self.sorted_game_lines(game_id).await? {
            let team_id = line.player.team_id;
            let side = if team_id.is_some() && team_id == game.home_team_id {
                &mut home_players
            } else if team_id.is_some() && team_id == game.away_team_id {
                &mut away_players
            } else {
                &mut unassigned_players
            };
            side.push(stat_line(line));
        }

        Ok(Some(BoxScore {
            game_id: game.game_id,
            title: game.title,
            status: game.status,
            home_team: game.home_team_name,
            away_team: game.away_team_name,
            home_score: game.home_score,
            away_score: game.away_score,
            home_players,
            away_players,
            unassigned_players,
        }))
    }
}

fn stat_line(line: PlayerStatLine) -> GameStatLine {
    GameStatLine {
        game_id: line.stat.game_id,
        user_id: line.player.user_id,
        player_name: line.player.user_name,
        is_student: line.player.is_student,
        grade_or_subject: line.player.grade_or_subject,
        position: line.player.position,
        jersey_number: line.player.jersey_number,
        goals: line.stat.goals,
        assists: line.stat.assists,
        yellow_cards: line.stat.yellow_cards,
        red_cards: line.stat.red_cards,
        minutes_played: line.stat.minutes_played,
        team_name: line.player.team_name,
    }
}

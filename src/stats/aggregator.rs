use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    calculators::{
        per_game, rank_all_players, rank_assisters, rank_scorers, rank_teams, recent_form,
        totals_by_user, PlayerTotals, TeamTally,
    },
    fallback::{live_or_fallback, FallbackProvider},
    repository::GameRecordStore,
    PlayerRecord, PlayerStatsRow, SeasonSummary, StatisticsOverview, StatsError, TeamRanking,
    TeamScorer, TeamStatsSummary, TopAssister, TopScorer, UserStatsSummary,
};

const RECENT_FORM_GAMES: usize = 5;
const TEAM_TOP_SCORERS: usize = 3;
const OVERVIEW_LIMIT: usize = 10;

/// Ranked and summary statistics views. Read-only.
///
/// Public methods never fail: store errors are answered with the fallback
/// provider's dataset of the same shape.
#[derive(Clone)]
pub struct StatAggregator {
    store: Arc<dyn GameRecordStore>,
    fallback: FallbackProvider,
}

impl StatAggregator {
    pub fn new(store: Arc<dyn GameRecordStore>, fallback: FallbackProvider) -> Self {
        Self { store, fallback }
    }

    #[instrument(skip(self))]
    pub async fn get_top_scorers(&self, limit: usize, season: Option<i32>) -> Vec<TopScorer> {
        live_or_fallback(
            "top_scorers",
            self.live_top_scorers(limit, season),
            || self.fallback.top_scorers(limit),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_top_assisters(&self, limit: usize, season: Option<i32>) -> Vec<TopAssister> {
        live_or_fallback(
            "top_assisters",
            self.live_top_assisters(limit, season),
            || self.fallback.top_assisters(limit),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_team_rankings(&self, season: Option<i32>) -> Vec<TeamRanking> {
        live_or_fallback("team_rankings", self.live_team_rankings(season), || {
            self.fallback.team_rankings()
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_season_stats(&self, season: i32) -> SeasonSummary {
        live_or_fallback("season_stats", self.live_season_stats(season), || {
            self.fallback.season_stats(season)
        })
        .await
    }

    /// Served from the rollup cache unless `season` is given, which forces a live
    /// recomputation over the raw stat rows.
    #[instrument(skip(self))]
    pub async fn get_user_stats(&self, user_id: &str, season: Option<i32>) -> UserStatsSummary {
        live_or_fallback("user_stats", self.live_user_stats(user_id, season), || {
            self.fallback.user_stats(user_id)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_team_stats(&self, team_id: i32, season: Option<i32>) -> TeamStatsSummary {
        live_or_fallback("team_stats", self.live_team_stats(team_id, season), || {
            self.fallback.team_stats(team_id)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_all_players_stats(
        &self,
        season: Option<i32>,
        limit: usize,
    ) -> Vec<PlayerStatsRow> {
        live_or_fallback("all_players", self.live_all_players(season, limit), || {
            self.fallback.all_players(limit)
        })
        .await
    }

    /// Entity summaries when ids are given, otherwise the league-wide leaderboards.
    ///
    /// Either way the response comes entirely from the store or entirely from the
    /// fallback provider. The three leaderboards are fetched concurrently.
    #[instrument(skip(self))]
    pub async fn get_statistics_overview(
        &self,
        user_id: Option<&str>,
        team_id: Option<i32>,
        season: Option<i32>,
    ) -> StatisticsOverview {
        if user_id.is_some() || team_id.is_some() {
            let live = async {
                let user = match user_id {
                    Some(id) => Some(self.live_user_stats(id, season).await?),
                    None => None,
                };
                let team = match team_id {
                    Some(id) => Some(self.live_team_stats(id, season).await?),
                    None => None,
                };
                Ok::<_, StatsError>(StatisticsOverview {
                    user,
                    team,
                    ..StatisticsOverview::default()
                })
            };

            return live_or_fallback("entity_overview", live, || StatisticsOverview {
                user: user_id.map(|id| self.fallback.user_stats(id)),
                team: team_id.map(|id| self.fallback.team_stats(id)),
                ..StatisticsOverview::default()
            })
            .await;
        }

        let live = async {
            let (scorers, assisters, rankings) = futures::try_join!(
                self.live_top_scorers(OVERVIEW_LIMIT, season),
                self.live_top_assisters(OVERVIEW_LIMIT, season),
                self.live_team_rankings(season),
            )?;
            Ok::<_, StatsError>(StatisticsOverview {
                top_scorers: Some(scorers),
                top_assisters: Some(assisters),
                team_rankings: Some(rankings),
                ..StatisticsOverview::default()
            })
        };

        live_or_fallback("statistics_overview", live, || StatisticsOverview {
            top_scorers: Some(self.fallback.top_scorers(OVERVIEW_LIMIT)),
            top_assisters: Some(self.fallback.top_assisters(OVERVIEW_LIMIT)),
            team_rankings: Some(self.fallback.team_rankings()),
            ..StatisticsOverview::default()
        })
        .await
    }

    async fn player_totals(
        &self,
        season: Option<i32>,
    ) -> Result<(Vec<PlayerRecord>, HashMap<String, PlayerTotals>), StatsError> {
        let players = self.store.list_players().await?;
        let stats = self.store.list_game_stats(season).await?;
        debug!(
            players = players.len(),
            stat_rows = stats.len(),
            "Loaded player stat rows"
        );
        Ok((players, totals_by_user(&stats)))
    }

    async fn live_top_scorers(
        &self,
        limit: usize,
        season: Option<i32>,
    ) -> Result<Vec<TopScorer>, StatsError> {
        let (players, totals) = self.player_totals(season).await?;
        Ok(rank_scorers(&players, &totals, limit))
    }

    async fn live_top_assisters(
        &self,
        limit: usize,
        season: Option<i32>,
    ) -> Result<Vec<TopAssister>, StatsError> {
        let (players, totals) = self.player_totals(season).await?;
        Ok(rank_assisters(&players, &totals, limit))
    }

    async fn live_all_players(
        &self,
        season: Option<i32>,
        limit: usize,
    ) -> Result<Vec<PlayerStatsRow>, StatsError> {
        let (players, totals) = self.player_totals(season).await?;
        Ok(rank_all_players(&players, &totals, limit))
    }

    async fn live_team_rankings(&self, season: Option<i32>) -> Result<Vec<TeamRanking>, StatsError> {
        let teams = self.store.list_teams().await?;
        let games = self.store.list_games(season).await?;

        let tallies: HashMap<i32, TeamTally> = teams
            .iter()
            .map(|t| (t.team_id, TeamTally::from_games(t.team_id, &games)))
            .collect();

        Ok(rank_teams(&teams, &tallies))
    }

    async fn live_season_stats(&self, season: i32) -> Result<SeasonSummary, StatsError> {
        let games = self.store.list_games(Some(season)).await?;
        let stats = self.store.list_game_stats(Some(season)).await?;

        let completed: Vec<_> = games.iter().filter(|g| g.status.is_completed()).collect();
        let completed_goals = completed
            .iter()
            .fold(0i32, |acc, g| acc.saturating_add(g.home_score).saturating_add(g.away_score));
        let mut teams: Vec<i32> = games
            .iter()
            .flat_map(|g| [g.home_team_id, g.away_team_id])
            .flatten()
            .collect();
        teams.sort_unstable();
        teams.dedup();
        let players = totals_by_user(&stats);

        Ok(SeasonSummary {
            season,
            total_games: games.len() as i32,
            completed_games: completed.len() as i32,
            total_players: players.len() as i32,
            total_teams: teams.len() as i32,
            total_goals: stats.iter().fold(0, |acc, s| acc.saturating_add(s.goals)),
            total_assists: stats.iter().fold(0, |acc, s| acc.saturating_add(s.assists)),
            avg_goals_per_game: per_game(completed_goals, completed.len() as i32),
        })
    }

    async fn live_user_stats(
        &self,
        user_id: &str,
        season: Option<i32>,
    ) -> Result<UserStatsSummary, StatsError> {
        let Some(player) = self.store.find_player(user_id).await? else {
            debug!(user_id = %user_id, "User not found, returning zero-valued stats");
            return Ok(UserStatsSummary::empty(user_id));
        };

        let totals = match season {
            Some(_) => {
                let lines = self.store.list_player_game_lines(user_id, season).await?;
                PlayerTotals::from_stats(lines.iter().map(|l| &l.stat))
            }
            None => PlayerTotals::from_rollups(&self.store.get_user_statistics(user_id).await?),
        };

        Ok(UserStatsSummary {
            user_id: player.user_id,
            user_name: player.user_name,
            is_student: player.is_student,
            grade_or_subject: player.grade_or_subject,
            position: player.position,
            jersey_number: player.jersey_number,
            games_played: totals.games_played,
            total_goals: totals.goals,
            total_assists: totals.assists,
            total_yellow_cards: totals.yellow_cards,
            total_red_cards: totals.red_cards,
            total_minutes_played: totals.minutes_played,
            avg_goals_per_game: totals.goals_per_game(),
            avg_assists_per_game: totals.assists_per_game(),
        })
    }

    async fn live_team_stats(
        &self,
        team_id: i32,
        season: Option<i32>,
    ) -> Result<TeamStatsSummary, StatsError> {
        let Some(team) = self.store.find_team(team_id).await? else {
            debug!(team_id, "Team not found, returning zero-valued stats");
            return Ok(TeamStatsSummary::empty(team_id));
        };

        let games: Vec<_> = self
            .store
            .list_games(season)
            .await?
            .into_iter()
            .filter(|g| g.status.is_completed() && g.involves(team_id))
            .collect();
        let tally = TeamTally::from_games(team_id, &games);

        let (players, totals) = self.player_totals(season).await?;
        let members: Vec<PlayerRecord> = players
            .into_iter()
            .filter(|p| p.team_id == Some(team_id))
            .collect();
        let top_scorers = rank_scorers(&members, &totals, TEAM_TOP_SCORERS)
            .into_iter()
            .map(|s| TeamScorer {
                player_name: s.user_name,
                goals: s.goals,
            })
            .collect();

        Ok(TeamStatsSummary {
            team_id,
            team_name: team.name,
            total_games: tally.completed_games,
            wins: tally.wins,
            losses: tally.losses,
            draws: tally.draws,
            goals_for: tally.goals_for,
            goals_against: tally.goals_against,
            goal_difference: tally.goal_difference(),
            points: tally.points(),
            win_rate: tally.win_rate(),
            top_scorers,
            recent_form: recent_form(team_id, &games, RECENT_FORM_GAMES),
        })
    }
}

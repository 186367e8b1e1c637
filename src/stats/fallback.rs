use std::future::Future;
use tracing::warn;

use super::{
    BoxScore, GameHistoryEntry, GameStatLine, PlayerStatsRow, SeasonSummary, StatsError,
    TeamRanking, TeamStatsSummary, TopAssister, TopScorer, UserStatsSummary,
};

/// Runs the live query; on any store error logs it and returns the fallback instead.
///
/// Each view is computed entirely from one source, so a response is never a mix of
/// live and placeholder rows.
pub async fn live_or_fallback<T, Fut, F>(operation: &'static str, live: Fut, fallback: F) -> T
where
    Fut: Future<Output = Result<T, StatsError>>,
    F: FnOnce() -> T,
{
    match live.await {
        Ok(value) => value,
        Err(err) => {
            warn!(operation, error = %err, "Store query failed, serving fallback data");
            fallback()
        }
    }
}

/// Fixed placeholder datasets served while the game record store is unreachable
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackProvider;

struct CannedPlayer {
    user_id: &'static str,
    user_name: &'static str,
    grade: &'static str,
    position: &'static str,
    jersey_number: i32,
    team_name: &'static str,
    goals: i32,
    assists: i32,
    yellow_cards: i32,
    total_games: i32,
    total_minutes: i32,
}

const CANNED_PLAYERS: [CannedPlayer; 5] = [
    CannedPlayer {
        user_id: "user1",
        user_name: "Kim Junyoung",
        grade: "Grade 3",
        position: "Forward",
        jersey_number: 10,
        team_name: "Daehan High School",
        goals: 15,
        assists: 14,
        yellow_cards: 2,
        total_games: 10,
        total_minutes: 900,
    },
    CannedPlayer {
        user_id: "user2",
        user_name: "Park Jisung",
        grade: "Grade 2",
        position: "Midfielder",
        jersey_number: 8,
        team_name: "Seoul High School",
        goals: 12,
        assists: 18,
        yellow_cards: 1,
        total_games: 10,
        total_minutes: 850,
    },
    CannedPlayer {
        user_id: "user3",
        user_name: "Lee Minjae",
        grade: "Grade 3",
        position: "Defender",
        jersey_number: 4,
        team_name: "Busan High School",
        goals: 10,
        assists: 4,
        yellow_cards: 3,
        total_games: 10,
        total_minutes: 900,
    },
    CannedPlayer {
        user_id: "user4",
        user_name: "Choi Jaewon",
        grade: "Grade 1",
        position: "Midfielder",
        jersey_number: 6,
        team_name: "Daegu High School",
        goals: 9,
        assists: 12,
        yellow_cards: 0,
        total_games: 10,
        total_minutes: 880,
    },
    CannedPlayer {
        user_id: "user5",
        user_name: "Song Heungmin",
        grade: "Grade 2",
        position: "Forward",
        jersey_number: 7,
        team_name: "Incheon High School",
        goals: 8,
        assists: 6,
        yellow_cards: 1,
        total_games: 9,
        total_minutes: 790,
    },
];

fn ratio(total: i32, games: i32) -> f64 {
    super::calculators::per_game(total, games)
}

impl FallbackProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn top_scorers(&self, limit: usize) -> Vec<TopScorer> {
        let mut players: Vec<&CannedPlayer> = CANNED_PLAYERS.iter().collect();
        players.sort_by(|a, b| b.goals.cmp(&a.goals));

        players
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, p)| TopScorer {
                rank: index as u32 + 1,
                user_id: p.user_id.to_string(),
                user_name: p.user_name.to_string(),
                is_student: true,
                grade_or_subject: Some(p.grade.to_string()),
                position: Some(p.position.to_string()),
                jersey_number: Some(p.jersey_number),
                team_name: Some(p.team_name.to_string()),
                goals: p.goals,
                assists: p.assists,
                total_games: p.total_games,
                total_minutes: p.total_minutes,
                goals_per_game: ratio(p.goals, p.total_games),
            })
            .collect()
    }

    pub fn top_assisters(&self, limit: usize) -> Vec<TopAssister> {
        let mut players: Vec<&CannedPlayer> = CANNED_PLAYERS.iter().collect();
        players.sort_by(|a, b| b.assists.cmp(&a.assists));

        players
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, p)| TopAssister {
                rank: index as u32 + 1,
                user_id: p.user_id.to_string(),
                user_name: p.user_name.to_string(),
                is_student: true,
                grade_or_subject: Some(p.grade.to_string()),
                position: Some(p.position.to_string()),
                jersey_number: Some(p.jersey_number),
                team_name: Some(p.team_name.to_string()),
                goals: p.goals,
                assists: p.assists,
                total_games: p.total_games,
                total_minutes: p.total_minutes,
                assists_per_game: ratio(p.assists, p.total_games),
            })
            .collect()
    }

    pub fn all_players(&self, limit: usize) -> Vec<PlayerStatsRow> {
        CANNED_PLAYERS
            .iter()
            .take(limit)
            .map(|p| PlayerStatsRow {
                user_id: p.user_id.to_string(),
                user_name: p.user_name.to_string(),
                is_student: true,
                grade_or_subject: Some(p.grade.to_string()),
                position: Some(p.position.to_string()),
                jersey_number: Some(p.jersey_number),
                team_name: Some(p.team_name.to_string()),
                goals: p.goals,
                assists: p.assists,
                yellow_cards: p.yellow_cards,
                red_cards: 0,
                total_games: p.total_games,
                total_minutes: p.total_minutes,
                goals_per_game: ratio(p.goals, p.total_games),
                assists_per_game: ratio(p.assists, p.total_games),
            })
            .collect()
    }

    pub fn team_rankings(&self) -> Vec<TeamRanking> {
        let rows = [
            (1, "Daehan High School", "Championship winners 2024", 8, 1, 1, 24, 8),
            (2, "Seoul High School", "Strong offensive team", 6, 2, 2, 20, 12),
            (3, "Busan High School", "Defensive specialists", 5, 3, 2, 18, 15),
        ];

        rows.into_iter()
            .enumerate()
            .map(
                |(index, (team_id, name, description, wins, losses, draws, gf, ga))| {
                    let completed = wins + losses + draws;
                    TeamRanking {
                        rank: index as u32 + 1,
                        team_id,
                        team_name: name.to_string(),
                        description: Some(description.to_string()),
                        logo_url: None,
                        total_games: completed,
                        completed_games: completed,
                        wins,
                        losses,
                        draws,
                        goals_for: gf,
                        goals_against: ga,
                        goal_difference: gf - ga,
                        points: wins * 3 + draws,
                        win_rate: super::calculators::round_to(
                            f64::from(wins) / f64::from(completed) * 100.0,
                            1,
                        ),
                    }
                },
            )
            .collect()
    }

    pub fn season_stats(&self, season: i32) -> SeasonSummary {
        SeasonSummary::empty(season)
    }

    pub fn user_stats(&self, user_id: &str) -> UserStatsSummary {
        UserStatsSummary::empty(user_id)
    }

    pub fn team_stats(&self, team_id: i32) -> TeamStatsSummary {
        TeamStatsSummary::empty(team_id)
    }

    /// Per-game views have no placeholder rows
    pub fn player_game_history(&self) -> Vec<GameHistoryEntry> {
        Vec::new()
    }

    pub fn game_stats(&self) -> Vec<GameStatLine> {
        Vec::new()
    }

    pub fn box_score(&self) -> Option<BoxScore> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scorers_are_sorted_and_sliced() {
        let scorers = FallbackProvider::new().top_scorers(3);
        assert_eq!(scorers.len(), 3);
        assert!(scorers.windows(2).all(|w| w[0].goals >= w[1].goals));
        assert_eq!(scorers[0].rank, 1);
        assert_eq!(scorers[0].goals_per_game, 1.5);
    }

    #[test]
    fn assisters_are_sorted_by_assists() {
        let assisters = FallbackProvider::new().top_assisters(10);
        assert_eq!(assisters.len(), 5);
        assert_eq!(assisters[0].user_id, "user2");
        assert!(assisters.windows(2).all(|w| w[0].assists >= w[1].assists));
    }

    #[test]
    fn rankings_satisfy_table_invariants() {
        for team in FallbackProvider::new().team_rankings() {
            assert_eq!(team.wins + team.losses + team.draws, team.completed_games);
            assert_eq!(team.goal_difference, team.goals_for - team.goals_against);
            assert_eq!(team.points, team.wins * 3 + team.draws);
        }
    }

    #[test]
    fn single_entity_fallbacks_are_zero_valued() {
        let provider = FallbackProvider::new();
        let user = provider.user_stats("missing");
        assert_eq!(user.user_id, "missing");
        assert_eq!(user.games_played, 0);

        let team = provider.team_stats(42);
        assert_eq!(team.team_id, 42);
        assert_eq!(team.points, 0);

        assert_eq!(provider.season_stats(2025).season, 2025);
    }

    #[test]
    fn per_game_fallbacks_are_empty() {
        let provider = FallbackProvider::new();
        assert!(provider.player_game_history().is_empty());
        assert!(provider.game_stats().is_empty());
        assert!(provider.box_score().is_none());
    }

    #[tokio::test]
    async fn live_or_fallback_prefers_live_data() {
        let value = live_or_fallback("test", async { Ok::<_, StatsError>(7) }, || 0).await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn live_or_fallback_uses_fallback_on_error() {
        let value = live_or_fallback(
            "test",
            async { Err::<i32, _>(StatsError::StoreUnavailable("down".into())) },
            || 3,
        )
        .await;
        assert_eq!(value, 3);
    }
}

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

// ============================================================================
// Store records
// ============================================================================

/// Lifecycle of a scheduled match
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl GameStatus {
    /// `scheduled → in_progress → completed`, or `scheduled → cancelled`
    pub fn can_transition_to(self, next: GameStatus) -> bool {
        matches!(
            (self, next),
            (GameStatus::Scheduled, GameStatus::InProgress)
                | (GameStatus::Scheduled, GameStatus::Completed)
                | (GameStatus::Scheduled, GameStatus::Cancelled)
                | (GameStatus::InProgress, GameStatus::Completed)
        )
    }

    pub fn is_completed(self) -> bool {
        self == GameStatus::Completed
    }
}

/// A user joined with profile attributes and primary team membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub user_id: String,
    pub user_name: String,
    pub is_student: bool,
    pub grade_or_subject: Option<String>,
    pub position: Option<String>,
    pub jersey_number: Option<i32>,
    pub team_id: Option<i32>,
    pub team_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

/// A game with team names already resolved (team name, else the name stored on the game)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: i32,
    pub title: String,
    pub home_team_id: Option<i32>,
    pub away_team_id: Option<i32>,
    pub home_team_name: String,
    pub away_team_name: String,
    pub game_date: DateTime<Utc>,
    pub venue: Option<String>,
    pub status: GameStatus,
    pub home_score: i32,
    pub away_score: i32,
}

impl GameRecord {
    /// Calendar year of the game date in UTC
    pub fn season(&self) -> i32 {
        self.game_date.year()
    }

    pub fn in_season(&self, season: Option<i32>) -> bool {
        season.map_or(true, |s| self.season() == s)
    }

    pub fn involves(&self, team_id: i32) -> bool {
        self.home_team_id == Some(team_id) || self.away_team_id == Some(team_id)
    }
}

/// One player's line for one game. Unique per (game_id, user_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatRecord {
    pub game_id: i32,
    pub user_id: String,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub minutes_played: i32,
}

/// A stat row joined with the game it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerGameLine {
    pub stat: GameStatRecord,
    pub game: GameRecord,
}

/// A stat row joined with the player who produced it
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatLine {
    pub player: PlayerRecord,
    pub stat: GameStatRecord,
}

/// Cached cumulative totals for one (user, season)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatistics {
    pub user_id: String,
    pub season: i32,
    pub games_played: i32,
    pub total_goals: i32,
    pub total_assists: i32,
    pub total_yellow_cards: i32,
    pub total_red_cards: i32,
    pub total_minutes_played: i32,
    pub average_goals_per_game: f64,
    pub average_assists_per_game: f64,
}

// ============================================================================
// Ingestion
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionBatch {
    #[serde(default)]
    pub games: Vec<GameRecord>,
    #[serde(default)]
    pub game_stats: Vec<GameStatRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionReceipt {
    pub games_written: usize,
    pub game_stats_written: usize,
    pub users_refreshed: usize,
    /// Users whose rollups could not be refreshed after the batch was committed
    #[serde(default)]
    pub stale_users: Vec<String>,
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopScorer {
    pub rank: u32,
    pub user_id: String,
    pub user_name: String,
    pub is_student: bool,
    pub grade_or_subject: Option<String>,
    pub position: Option<String>,
    pub jersey_number: Option<i32>,
    pub team_name: Option<String>,
    pub goals: i32,
    pub assists: i32,
    pub total_games: i32,
    pub total_minutes: i32,
    pub goals_per_game: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopAssister {
    pub rank: u32,
    pub user_id: String,
    pub user_name: String,
    pub is_student: bool,
    pub grade_or_subject: Option<String>,
    pub position: Option<String>,
    pub jersey_number: Option<i32>,
    pub team_name: Option<String>,
    pub goals: i32,
    pub assists: i32,
    pub total_games: i32,
    pub total_minutes: i32,
    pub assists_per_game: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRanking {
    pub rank: u32,
    pub team_id: i32,
    pub team_name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub total_games: i32,
    pub completed_games: i32,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_difference: i32,
    pub points: i32,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatsSummary {
    pub user_id: String,
    pub user_name: String,
    pub is_student: bool,
    pub grade_or_subject: Option<String>,
    pub position: Option<String>,
    pub jersey_number: Option<i32>,
    pub games_played: i32,
    pub total_goals: i32,
    pub total_assists: i32,
    pub total_yellow_cards: i32,
    pub total_red_cards: i32,
    pub total_minutes_played: i32,
    pub avg_goals_per_game: f64,
    pub avg_assists_per_game: f64,
}

impl UserStatsSummary {
    /// Zero-valued summary for an id with no data
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_name: String::new(),
            is_student: false,
            grade_or_subject: None,
            position: None,
            jersey_number: None,
            games_played: 0,
            total_goals: 0,
            total_assists: 0,
            total_yellow_cards: 0,
            total_red_cards: 0,
            total_minutes_played: 0,
            avg_goals_per_game: 0.0,
            avg_assists_per_game: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormResult {
    W,
    D,
    L,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamScorer {
    pub player_name: String,
    pub goals: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatsSummary {
    pub team_id: i32,
    pub team_name: String,
    pub total_games: i32,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_difference: i32,
    pub points: i32,
    pub win_rate: f64,
    pub top_scorers: Vec<TeamScorer>,
    pub recent_form: Vec<FormResult>,
}

impl TeamStatsSummary {
    pub fn empty(team_id: i32) -> Self {
        Self {
            team_id,
            team_name: String::new(),
            total_games: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            goals_for: 0,
            goals_against: 0,
            goal_difference: 0,
            points: 0,
            win_rate: 0.0,
            top_scorers: Vec::new(),
            recent_form: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season: i32,
    pub total_games: i32,
    pub completed_games: i32,
    pub total_players: i32,
    pub total_teams: i32,
    pub total_goals: i32,
    pub total_assists: i32,
    pub avg_goals_per_game: f64,
}

impl SeasonSummary {
    pub fn empty(season: i32) -> Self {
        Self {
            season,
            total_games: 0,
            completed_games: 0,
            total_players: 0,
            total_teams: 0,
            total_goals: 0,
            total_assists: 0,
            avg_goals_per_game: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatsRow {
    pub user_id: String,
    pub user_name: String,
    pub is_student: bool,
    pub grade_or_subject: Option<String>,
    pub position: Option<String>,
    pub jersey_number: Option<i32>,
    pub team_name: Option<String>,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub total_games: i32,
    pub total_minutes: i32,
    pub goals_per_game: f64,
    pub assists_per_game: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPerformance {
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub minutes_played: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameHistoryEntry {
    pub game_id: i32,
    pub title: String,
    pub game_date: DateTime<Utc>,
    pub venue: Option<String>,
    pub status: GameStatus,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub player_performance: PlayerPerformance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStatLine {
    pub game_id: i32,
    pub user_id: String,
    pub player_name: String,
    pub is_student: bool,
    pub grade_or_subject: Option<String>,
    pub position: Option<String>,
    pub jersey_number: Option<i32>,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub minutes_played: i32,
    pub team_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxScore {
    pub game_id: i32,
    pub title: String,
    pub status: GameStatus,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub home_players: Vec<GameStatLine>,
    pub away_players: Vec<GameStatLine>,
    pub unassigned_players: Vec<GameStatLine>,
}

/// Combined statistics view; sections are present depending on the filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsOverview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserStatsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamStatsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_scorers: Option<Vec<TopScorer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_assisters: Option<Vec<TopAssister>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_rankings: Option<Vec<TeamRanking>>,
}

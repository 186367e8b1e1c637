use serde::{Deserialize, Serialize};

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_PLAYERS_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 100;

/// Envelope for every statistics response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Raw query filters. Kept as strings so malformed values coerce instead of rejecting.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub limit: Option<String>,
    pub season: Option<String>,
    pub user_id: Option<String>,
    pub team_id: Option<String>,
}

impl StatsQuery {
    pub fn limit_or(&self, default: usize) -> usize {
        parse_limit(self.limit.as_deref(), default)
    }

    pub fn season(&self) -> Option<i32> {
        parse_season(self.season.as_deref())
    }

    pub fn team_id(&self) -> Option<i32> {
        self.team_id.as_deref().and_then(|raw| raw.trim().parse().ok())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Positive integers are capped at `MAX_LIMIT`; anything else falls back to `default`
pub fn parse_limit(raw: Option<&str>, default: usize) -> usize {
    match raw.and_then(|value| value.trim().parse::<i64>().ok()) {
        Some(limit) if limit > 0 => (limit as usize).min(MAX_LIMIT),
        _ => default,
    }
}

/// Only a 4-digit year filters; anything else means all time
pub fn parse_season(raw: Option<&str>) -> Option<i32> {
    let value = raw?.trim();
    if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
        value.parse().ok()
    } else {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResultRequest {
    pub home_score: i32,
    pub away_score: i32,
}

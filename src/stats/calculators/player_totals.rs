use std::collections::{BTreeMap, HashMap};

use super::per_game;
use crate::stats::{GameStatRecord, PlayerGameLine, UserStatistics};

/// Running totals over a player's stat rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerTotals {
    pub games_played: i32,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub minutes_played: i32,
}

impl PlayerTotals {
    /// Rows are unique per (game, user), so each row is one game played.
    ///
    /// Sums saturate at `i32::MAX` so out-of-range stored rows cannot wrap a total.
    pub fn add(&mut self, stat: &GameStatRecord) {
        self.games_played = self.games_played.saturating_add(1);
        self.goals = self.goals.saturating_add(stat.goals);
        self.assists = self.assists.saturating_add(stat.assists);
        self.yellow_cards = self.yellow_cards.saturating_add(stat.yellow_cards);
        self.red_cards = self.red_cards.saturating_add(stat.red_cards);
        self.minutes_played = self.minutes_played.saturating_add(stat.minutes_played);
    }

    pub fn from_stats<'a>(stats: impl IntoIterator<Item = &'a GameStatRecord>) -> Self {
        let mut totals = Self::default();
        for stat in stats {
            totals.add(stat);
        }
        totals
    }

    /// Sums per-season rollups back into all-time totals.
    pub fn from_rollups(rollups: &[UserStatistics]) -> Self {
        rollups.iter().fold(Self::default(), |acc, r| Self {
            games_played: acc.games_played.saturating_add(r.games_played),
            goals: acc.goals.saturating_add(r.total_goals),
            assists: acc.assists.saturating_add(r.total_assists),
            yellow_cards: acc.yellow_cards.saturating_add(r.total_yellow_cards),
            red_cards: acc.red_cards.saturating_add(r.total_red_cards),
            minutes_played: acc.minutes_played.saturating_add(r.total_minutes_played),
        })
    }

    pub fn goals_per_game(&self) -> f64 {
        per_game(self.goals, self.games_played)
    }

    pub fn assists_per_game(&self) -> f64 {
        per_game(self.assists, self.games_played)
    }

    pub fn into_rollup(self, user_id: &str, season: i32) -> UserStatistics {
        UserStatistics {
            user_id: user_id.to_string(),
            season,
            games_played: self.games_played,
            total_goals: self.goals,
            total_assists: self.assists,
            total_yellow_cards: self.yellow_cards,
            total_red_cards: self.red_cards,
            total_minutes_played: self.minutes_played,
            average_goals_per_game: self.goals_per_game(),
            average_assists_per_game: self.assists_per_game(),
        }
    }
}

pub fn totals_by_user(stats: &[GameStatRecord]) -> HashMap<String, PlayerTotals> {
    let mut totals: HashMap<String, PlayerTotals> = HashMap::new();
    for stat in stats {
        totals.entry(stat.user_id.clone()).or_default().add(stat);
    }
    totals
}

/// Groups one player's lines by season, ascending.
pub fn totals_by_season(lines: &[PlayerGameLine]) -> BTreeMap<i32, PlayerTotals> {
    let mut totals: BTreeMap<i32, PlayerTotals> = BTreeMap::new();
    for line in lines {
        totals.entry(line.game.season()).or_default().add(&line.stat);
    }
    totals
}

use chrono::{Duration, TimeZone, Utc};

use sportsboard::stats::{
    GameRecord, GameStatRecord, GameStatus, IngestionBatch, InMemoryGameRecordStore, PlayerRecord,
    TeamRecord,
};

// ============================================================================
// Record Builders
// ============================================================================

pub fn team(team_id: i32, name: &str) -> TeamRecord {
    TeamRecord {
        team_id,
        name: name.to_string(),
        description: None,
        logo_url: None,
    }
}

pub fn player(user_id: &str, name: &str, team: Option<&TeamRecord>) -> PlayerRecord {
    PlayerRecord {
        user_id: user_id.to_string(),
        user_name: name.to_string(),
        is_student: true,
        grade_or_subject: Some("Grade 3".to_string()),
        position: Some("Forward".to_string()),
        jersey_number: Some(9),
        team_id: team.map(|t| t.team_id),
        team_name: team.map(|t| t.name.clone()),
    }
}

/// Game on day `day` of `year`
pub fn game(
    game_id: i32,
    year: i32,
    day: i64,
    home: &TeamRecord,
    away: &TeamRecord,
    status: GameStatus,
    score: (i32, i32),
) -> GameRecord {
    GameRecord {
        game_id,
        title: format!("{} vs {}", home.name, away.name),
        home_team_id: Some(home.team_id),
        away_team_id: Some(away.team_id),
        home_team_name: home.name.clone(),
        away_team_name: away.name.clone(),
        game_date: Utc.with_ymd_and_hms(year, 1, 1, 14, 0, 0).unwrap() + Duration::days(day),
        venue: Some("Stadium".to_string()),
        status,
        home_score: score.0,
        away_score: score.1,
    }
}

pub fn stat(game_id: i32, user_id: &str, goals: i32, assists: i32) -> GameStatRecord {
    GameStatRecord {
        game_id,
        user_id: user_id.to_string(),
        goals,
        assists,
        yellow_cards: 0,
        red_cards: 0,
        minutes_played: 90,
    }
}

// ============================================================================
// League Builder
// ============================================================================

/// Seeds a store with teams and players; games and stat rows go through ingestion
#[derive(Default)]
pub struct LeagueBuilder {
    teams: Vec<TeamRecord>,
    players: Vec<PlayerRecord>,
    games: Vec<GameRecord>,
    game_stats: Vec<GameStatRecord>,
}

impl LeagueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_team(mut self, team: TeamRecord) -> Self {
        self.teams.push(team);
        self
    }

    pub fn with_player(mut self, player: PlayerRecord) -> Self {
        self.players.push(player);
        self
    }

    pub fn with_game(mut self, game: GameRecord) -> Self {
        self.games.push(game);
        self
    }

    pub fn with_stat(mut self, stat: GameStatRecord) -> Self {
        self.game_stats.push(stat);
        self
    }

    /// Roster only; the games and stat rows are returned as a batch to ingest
    pub fn build(self) -> (InMemoryGameRecordStore, IngestionBatch) {
        let store = InMemoryGameRecordStore::with_records(self.players, self.teams, vec![], vec![]);
        let batch = IngestionBatch {
            games: self.games,
            game_stats: self.game_stats,
        };
        (store, batch)
    }
}

use std::cmp::Ordering;

use super::round_to;
use crate::stats::{FormResult, GameRecord};

/// Win/draw/loss tally for one team.
///
/// `total_games` counts every game the team appears in; results and goals only
/// count completed games, so `wins + draws + losses == completed_games`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamTally {
    pub total_games: i32,
    pub completed_games: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub goals_for: i32,
    pub goals_against: i32,
}

impl TeamTally {
    pub fn from_games<'a>(team_id: i32, games: impl IntoIterator<Item = &'a GameRecord>) -> Self {
        let mut tally = Self::default();
        for game in games {
            tally.record(team_id, game);
        }
        tally
    }

    pub fn record(&mut self, team_id: i32, game: &GameRecord) {
        if !game.involves(team_id) {
            return;
        }
        self.total_games += 1;

        let Some(outcome) = outcome_for(team_id, game) else {
            return;
        };
        let (scored, conceded) = scores_for(team_id, game);
        self.completed_games += 1;
        self.goals_for = self.goals_for.saturating_add(scored);
        self.goals_against = self.goals_against.saturating_add(conceded);
        match outcome {
            FormResult::W => self.wins += 1,
            FormResult::D => self.draws += 1,
            FormResult::L => self.losses += 1,
        }
    }

    pub fn points(&self) -> i32 {
        self.wins * 3 + self.draws
    }

    pub fn goal_difference(&self) -> i32 {
        self.goals_for.saturating_sub(self.goals_against)
    }

    /// Percentage to one decimal, 0 without completed games.
    pub fn win_rate(&self) -> f64 {
        if self.completed_games == 0 {
            return 0.0;
        }
        round_to(
            f64::from(self.wins) / f64::from(self.completed_games) * 100.0,
            1,
        )
    }
}

fn scores_for(team_id: i32, game: &GameRecord) -> (i32, i32) {
    if game.home_team_id == Some(team_id) {
        (game.home_score, game.away_score)
    } else {
        (game.away_score, game.home_score)
    }
}

/// Result of a completed game from one team's side; `None` otherwise.
pub fn outcome_for(team_id: i32, game: &GameRecord) -> Option<FormResult> {
    if !game.status.is_completed() || !game.involves(team_id) {
        return None;
    }
    let (scored, conceded) = scores_for(team_id, game);
    Some(match scored.cmp(&conceded) {
        Ordering::Greater => FormResult::W,
        Ordering::Equal => FormResult::D,
        Ordering::Less => FormResult::L,
    })
}

/// Results of the team's latest `count` completed games, newest first.
pub fn recent_form(team_id: i32, games: &[GameRecord], count: usize) -> Vec<FormResult> {
    let mut completed: Vec<&GameRecord> = games
        .iter()
        .filter(|g| g.status.is_completed() && g.involves(team_id))
        .collect();
    completed.sort_by(|a, b| b.game_date.cmp(&a.game_date).then(b.game_id.cmp(&a.game_id)));
    completed
        .into_iter()
        .take(count)
        .filter_map(|g| outcome_for(team_id, g))
        .collect()
}

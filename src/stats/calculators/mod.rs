//! Pure statistics math. Every "zero when absent" rule lives here once.

mod leaderboard;
mod player_totals;
mod standings;

pub use leaderboard::{rank_all_players, rank_assisters, rank_scorers, rank_teams};
pub use player_totals::{totals_by_season, totals_by_user, PlayerTotals};
pub use standings::{outcome_for, recent_form, TeamTally};

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `total / games` to two decimals, 0 when no games were played.
pub fn per_game(total: i32, games: i32) -> f64 {
    if games <= 0 {
        return 0.0;
    }
    round_to(f64::from(total) / f64::from(games), 2)
}

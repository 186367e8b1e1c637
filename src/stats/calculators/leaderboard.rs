use std::cmp::Ordering;
use std::collections::HashMap;

use super::{PlayerTotals, TeamTally};
use crate::stats::{
    PlayerRecord, PlayerStatsRow, TeamRanking, TeamRecord, TopAssister, TopScorer,
};

type Entry<'a> = (&'a PlayerRecord, PlayerTotals);

fn by_identity(a: &Entry, b: &Entry) -> Ordering {
    a.0.user_name
        .cmp(&b.0.user_name)
        .then_with(|| a.0.user_id.cmp(&b.0.user_id))
}

fn entries<'a>(
    players: &'a [PlayerRecord],
    totals: &HashMap<String, PlayerTotals>,
) -> Vec<Entry<'a>> {
    players
        .iter()
        .map(|p| (p, totals.get(&p.user_id).copied().unwrap_or_default()))
        .collect()
}

/// Goals desc, goals per game desc, assists desc. Players without goals are dropped.
pub fn rank_scorers(
    players: &[PlayerRecord],
    totals: &HashMap<String, PlayerTotals>,
    limit: usize,
) -> Vec<TopScorer> {
    let mut ranked: Vec<Entry> = entries(players, totals)
        .into_iter()
        .filter(|(_, t)| t.goals > 0)
        .collect();

    ranked.sort_by(|a, b| {
        b.1.goals
            .cmp(&a.1.goals)
            .then_with(|| b.1.goals_per_game().total_cmp(&a.1.goals_per_game()))
            .then_with(|| b.1.assists.cmp(&a.1.assists))
            .then_with(|| by_identity(a, b))
    });

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, (player, t))| TopScorer {
            rank: index as u32 + 1,
            user_id: player.user_id.clone(),
            user_name: player.user_name.clone(),
            is_student: player.is_student,
            grade_or_subject: player.grade_or_subject.clone(),
            position: player.position.clone(),
            jersey_number: player.jersey_number,
            team_name: player.team_name.clone(),
            goals: t.goals,
            assists: t.assists,
            total_games: t.games_played,
            total_minutes: t.minutes_played,
            goals_per_game: t.goals_per_game(),
        })
        .collect()
}

/// Assists desc, assists per game desc, goals desc. Players without assists are dropped.
pub fn rank_assisters(
    players: &[PlayerRecord],
    totals: &HashMap<String, PlayerTotals>,
    limit: usize,
) -> Vec<TopAssister> {
    let mut ranked: Vec<Entry> = entries(players, totals)
        .into_iter()
        .filter(|(_, t)| t.assists > 0)
        .collect();

    ranked.sort_by(|a, b| {
        b.1.assists
            .cmp(&a.1.assists)
            .then_with(|| b.1.assists_per_game().total_cmp(&a.1.assists_per_game()))
            .then_with(|| b.1.goals.cmp(&a.1.goals))
            .then_with(|| by_identity(a, b))
    });

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, (player, t))| TopAssister {
            rank: index as u32 + 1,
            user_id: player.user_id.clone(),
            user_name: player.user_name.clone(),
            is_student: player.is_student,
            grade_or_subject: player.grade_or_subject.clone(),
            position: player.position.clone(),
            jersey_number: player.jersey_number,
            team_name: player.team_name.clone(),
            goals: t.goals,
            assists: t.assists,
            total_games: t.games_played,
            total_minutes: t.minutes_played,
            assists_per_game: t.assists_per_game(),
        })
        .collect()
}

/// Every player, goals desc, assists desc, games played desc.
pub fn rank_all_players(
    players: &[PlayerRecord],
    totals: &HashMap<String, PlayerTotals>,
    limit: usize,
) -> Vec<PlayerStatsRow> {
    let mut ranked = entries(players, totals);

    ranked.sort_by(|a, b| {
        b.1.goals
            .cmp(&a.1.goals)
            .then_with(|| b.1.assists.cmp(&a.1.assists))
            .then_with(|| b.1.games_played.cmp(&a.1.games_played))
            .then_with(|| by_identity(a, b))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(player, t)| PlayerStatsRow {
            user_id: player.user_id.clone(),
            user_name: player.user_name.clone(),
            is_student: player.is_student,
            grade_or_subject: player.grade_or_subject.clone(),
            position: player.position.clone(),
            jersey_number: player.jersey_number,
            team_name: player.team_name.clone(),
            goals: t.goals,
            assists: t.assists,
            yellow_cards: t.yellow_cards,
            red_cards: t.red_cards,
            total_games: t.games_played,
            total_minutes: t.minutes_played,
            goals_per_game: t.goals_per_game(),
            assists_per_game: t.assists_per_game(),
        })
        .collect()
}

/// Points desc, goal difference desc, goals for desc. Every team is listed.
pub fn rank_teams(teams: &[TeamRecord], tallies: &HashMap<i32, TeamTally>) -> Vec<TeamRanking> {
    let mut ranked: Vec<(&TeamRecord, TeamTally)> = teams
        .iter()
        .map(|t| (t, tallies.get(&t.team_id).copied().unwrap_or_default()))
        .collect();

    ranked.sort_by(|(ta, a), (tb, b)| {
        b.points()
            .cmp(&a.points())
            .then_with(|| b.goal_difference().cmp(&a.goal_difference()))
            .then_with(|| b.goals_for.cmp(&a.goals_for))
            .then_with(|| ta.name.cmp(&tb.name))
            .then_with(|| ta.team_id.cmp(&tb.team_id))
    });

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (team, t))| TeamRanking {
            rank: index as u32 + 1,
            team_id: team.team_id,
            team_name: team.name.clone(),
            description: team.description.clone(),
            logo_url: team.logo_url.clone(),
            total_games: t.total_games,
            completed_games: t.completed_games,
            wins: t.wins,
            losses: t.losses,
            draws: t.draws,
            goals_for: t.goals_for,
            goals_against: t.goals_against,
            goal_difference: t.goal_difference(),
            points: t.points(),
            win_rate: t.win_rate(),
        })
        .collect()
}

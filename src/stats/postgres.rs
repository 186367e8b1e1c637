use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use tracing::{debug, instrument, warn};

use super::{
    repository::GameRecordStore, GameRecord, GameStatRecord, GameStatus, IngestionBatch,
    PlayerGameLine, PlayerRecord, PlayerStatLine, StatsError, TeamRecord, UserStatistics,
};

// A player's primary team is the membership with the lowest team id
const PLAYER_COLUMNS: &str = r#"
    SELECT
        u.id::TEXT AS user_id,
        u.name AS user_name,
        COALESCE(u.is_student, FALSE) AS is_student,
        u.grade_or_subject,
        up.position,
        up.jersey_number,
        pt.team_id,
        t.name AS team_name
    FROM users u
    LEFT JOIN user_profiles up ON up.user_id = u.id
    LEFT JOIN (
        SELECT user_id, MIN(team_id) AS team_id FROM user_teams GROUP BY user_id
    ) pt ON pt.user_id = u.id
    LEFT JOIN teams t ON t.id = pt.team_id
"#;

const GAME_COLUMNS: &str = r#"
    SELECT
        g.id AS game_id,
        g.title,
        g.home_team_id,
        g.away_team_id,
        COALESCE(ht.name, g.home_team_name, '') AS home_team_name,
        COALESCE(at.name, g.away_team_name, '') AS away_team_name,
        g.game_date,
        g.venue,
        g.status,
        COALESCE(g.home_score, 0) AS home_score,
        COALESCE(g.away_score, 0) AS away_score
    FROM games g
    LEFT JOIN teams ht ON ht.id = g.home_team_id
    LEFT JOIN teams at ON at.id = g.away_team_id
"#;

// Seasons are UTC calendar years, matching `GameRecord::season`
const SEASON_FILTER: &str = "($1::INT IS NULL OR EXTRACT(YEAR FROM g.game_date AT TIME ZONE 'UTC')::INT = $1)";

#[derive(Debug, FromRow)]
struct PlayerRow {
    user_id: String,
    user_name: String,
    is_student: bool,
    grade_or_subject: Option<String>,
    position: Option<String>,
    jersey_number: Option<i32>,
    team_id: Option<i32>,
    team_name: Option<String>,
}

impl From<PlayerRow> for PlayerRecord {
    fn from(row: PlayerRow) -> Self {
        Self {
            user_id: row.user_id,
            user_name: row.user_name,
            is_student: row.is_student,
            grade_or_subject: row.grade_or_subject,
            position: row.position,
            jersey_number: row.jersey_number,
            team_id: row.team_id,
            team_name: row.team_name,
        }
    }
}

#[derive(Debug, FromRow)]
struct TeamRow {
    id: i32,
    name: String,
    description: Option<String>,
    logo_url: Option<String>,
}

impl From<TeamRow> for TeamRecord {
    fn from(row: TeamRow) -> Self {
        Self {
            team_id: row.id,
            name: row.name,
            description: row.description,
            logo_url: row.logo_url,
        }
    }
}

#[derive(Debug, FromRow)]
struct GameRow {
    game_id: i32,
    title: String,
    home_team_id: Option<i32>,
    away_team_id: Option<i32>,
    home_team_name: String,
    away_team_name: String,
    game_date: DateTime<Utc>,
    venue: Option<String>,
    status: String,
    home_score: i32,
    away_score: i32,
}

impl TryFrom<GameRow> for GameRecord {
    type Error = StatsError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let status = GameStatus::from_str(&row.status).map_err(|_| {
            StatsError::StoreUnavailable(format!(
                "game {} has unknown status '{}'",
                row.game_id, row.status
            ))
        })?;

        Ok(Self {
            game_id: row.game_id,
            title: row.title,
            home_team_id: row.home_team_id,
            away_team_id: row.away_team_id,
            home_team_name: row.home_team_name,
            away_team_name: row.away_team_name,
            game_date: row.game_date,
            venue: row.venue,
            status,
            home_score: row.home_score,
            away_score: row.away_score,
        })
    }
}

#[derive(Debug, FromRow)]
struct GameStatRow {
    game_id: i32,
    user_id: String,
    goals: i32,
    assists: i32,
    yellow_cards: i32,
    red_cards: i32,
    minutes_played: i32,
}

impl From<GameStatRow> for GameStatRecord {
    fn from(row: GameStatRow) -> Self {
        Self {
            game_id: row.game_id,
            user_id: row.user_id,
            goals: row.goals,
            assists: row.assists,
            yellow_cards: row.yellow_cards,
            red_cards: row.red_cards,
            minutes_played: row.minutes_played,
        }
    }
}

#[derive(Debug, FromRow)]
struct RollupRow {
    user_id: String,
    season: i32,
    total_games: i32,
    total_goals: i32,
    total_assists: i32,
    total_yellow_cards: i32,
    total_red_cards: i32,
    total_minutes_played: i32,
    average_goals_per_game: f64,
    average_assists_per_game: f64,
}

impl From<RollupRow> for UserStatistics {
    fn from(row: RollupRow) -> Self {
        Self {
            user_id: row.user_id,
            season: row.season,
            games_played: row.total_games,
            total_goals: row.total_goals,
            total_assists: row.total_assists,
            total_yellow_cards: row.total_yellow_cards,
            total_red_cards: row.total_red_cards,
            total_minutes_played: row.total_minutes_played,
            average_goals_per_game: row.average_goals_per_game,
            average_assists_per_game: row.average_assists_per_game,
        }
    }
}

fn store_error(operation: &'static str) -> impl Fn(sqlx::Error) -> StatsError {
    move |e| {
        warn!(error = %e, operation, "Game record store query failed");
        StatsError::from(e)
    }
}

fn ingestion_error(e: sqlx::Error) -> StatsError {
    warn!(error = %e, "Batch rejected by database");
    match e {
        sqlx::Error::Database(db) => StatsError::Ingestion(db.message().to_string()),
        other => StatsError::from(other),
    }
}

fn games_from_rows(rows: Vec<GameRow>) -> Result<Vec<GameRecord>, StatsError> {
    rows.into_iter().map(GameRecord::try_from).collect()
}

/// PostgreSQL implementation of the game record store
pub struct PostgresGameRecordStore {
    pool: PgPool,
}

impl PostgresGameRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_game(
        tx: &mut Transaction<'_, Postgres>,
        game: &GameRecord,
    ) -> Result<(), StatsError> {
        sqlx::query(
            r#"
            INSERT INTO games (id, title, home_team_id, away_team_id, home_team_name, away_team_name,
                               game_date, venue, status, home_score, away_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                home_team_id = EXCLUDED.home_team_id,
                away_team_id = EXCLUDED.away_team_id,
                home_team_name = EXCLUDED.home_team_name,
                away_team_name = EXCLUDED.away_team_name,
                game_date = EXCLUDED.game_date,
                venue = EXCLUDED.venue,
                status = EXCLUDED.status,
                home_score = EXCLUDED.home_score,
                away_score = EXCLUDED.away_score
            "#,
        )
        .bind(game.game_id)
        .bind(&game.title)
        .bind(game.home_team_id)
        .bind(game.away_team_id)
        .bind(&game.home_team_name)
        .bind(&game.away_team_name)
        .bind(game.game_date)
        .bind(&game.venue)
        .bind(game.status.as_ref())
        .bind(game.home_score)
        .bind(game.away_score)
        .execute(&mut **tx)
        .await
        .map_err(ingestion_error)?;
        Ok(())
    }

    async fn upsert_game_stat(
        tx: &mut Transaction<'_, Postgres>,
        stat: &GameStatRecord,
    ) -> Result<(), StatsError> {
        sqlx::query(
            r#"
            INSERT INTO game_stats (game_id, user_id, goals, assists, yellow_cards, red_cards, minutes_played)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (game_id, user_id) DO UPDATE SET
                goals = EXCLUDED.goals,
                assists = EXCLUDED.assists,
                yellow_cards = EXCLUDED.yellow_cards,
                red_cards = EXCLUDED.red_cards,
                minutes_played = EXCLUDED.minutes_played
            "#,
        )
        .bind(stat.game_id)
        .bind(&stat.user_id)
        .bind(stat.goals)
        .bind(stat.assists)
        .bind(stat.yellow_cards)
        .bind(stat.red_cards)
        .bind(stat.minutes_played)
        .execute(&mut **tx)
        .await
        .map_err(ingestion_error)?;
        Ok(())
    }
}

#[async_trait]
impl GameRecordStore for PostgresGameRecordStore {
    #[instrument(skip(self))]
    async fn list_players(&self) -> Result<Vec<PlayerRecord>, StatsError> {
        let rows: Vec<PlayerRow> = sqlx::query_as(PLAYER_COLUMNS)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("list_players"))?;

        debug!(players = rows.len(), "Players loaded from database");
        Ok(rows.into_iter().map(PlayerRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_player(&self, user_id: &str) -> Result<Option<PlayerRecord>, StatsError> {
        let query = format!("{} WHERE u.id::TEXT = $1", PLAYER_COLUMNS);
        let row: Option<PlayerRow> = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error("find_player"))?;

        Ok(row.map(PlayerRecord::from))
    }

    #[instrument(skip(self))]
    async fn list_teams(&self) -> Result<Vec<TeamRecord>, StatsError> {
        let rows: Vec<TeamRow> =
            sqlx::query_as("SELECT id, name, description, logo_url FROM teams")
                .fetch_all(&self.pool)
                .await
                .map_err(store_error("list_teams"))?;

        Ok(rows.into_iter().map(TeamRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_team(&self, team_id: i32) -> Result<Option<TeamRecord>, StatsError> {
        let row: Option<TeamRow> =
            sqlx::query_as("SELECT id, name, description, logo_url FROM teams WHERE id = $1")
                .bind(team_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("find_team"))?;

        Ok(row.map(TeamRecord::from))
    }

    #[instrument(skip(self))]
    async fn find_game(&self, game_id: i32) -> Result<Option<GameRecord>, StatsError> {
        let query = format!("{} WHERE g.id = $1", GAME_COLUMNS);
        let row: Option<GameRow> = sqlx::query_as(&query)
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error("find_game"))?;

        row.map(GameRecord::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_games(&self, season: Option<i32>) -> Result<Vec<GameRecord>, StatsError> {
        let query = format!("{} WHERE {}", GAME_COLUMNS, SEASON_FILTER);
        let rows: Vec<GameRow> = sqlx::query_as(&query)
            .bind(season)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("list_games"))?;

        debug!(games = rows.len(), "Games loaded from database");
        games_from_rows(rows)
    }

    #[instrument(skip(self))]
    async fn list_game_stats(
        &self,
        season: Option<i32>,
    ) -> Result<Vec<GameStatRecord>, StatsError> {
        let query = format!(
            r#"
            SELECT gs.game_id, gs.user_id::TEXT AS user_id, gs.goals, gs.assists,
                   gs.yellow_cards, gs.red_cards, gs.minutes_played
            FROM game_stats gs
            JOIN games g ON g.id = gs.game_id
            WHERE {}
            "#,
            SEASON_FILTER
        );
        let rows: Vec<GameStatRow> = sqlx::query_as(&query)
            .bind(season)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("list_game_stats"))?;

        debug!(stat_rows = rows.len(), "Game stats loaded from database");
        Ok(rows.into_iter().map(GameStatRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_player_game_lines(
        &self,
        user_id: &str,
        season: Option<i32>,
    ) -> Result<Vec<PlayerGameLine>, StatsError> {
        let stat_query = format!(
            r#"
            SELECT gs.game_id, gs.user_id::TEXT AS user_id, gs.goals, gs.assists,
                   gs.yellow_cards, gs.red_cards, gs.minutes_played
            FROM game_stats gs
            JOIN games g ON g.id = gs.game_id
            WHERE {} AND gs.user_id::TEXT = $2
            "#,
            SEASON_FILTER
        );
        let stats: Vec<GameStatRow> = sqlx::query_as(&stat_query)
            .bind(season)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("list_player_game_lines"))?;

        let game_query = format!(
            "{} WHERE {} AND g.id IN (SELECT game_id FROM game_stats WHERE user_id::TEXT = $2)",
            GAME_COLUMNS, SEASON_FILTER
        );
        let games: Vec<GameRow> = sqlx::query_as(&game_query)
            .bind(season)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("list_player_game_lines"))?;
        let games = games_from_rows(games)?;

        Ok(stats
            .into_iter()
            .filter_map(|stat| {
                let game = games.iter().find(|g| g.game_id == stat.game_id)?.clone();
                Some(PlayerGameLine {
                    stat: stat.into(),
                    game,
                })
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_game_lines(&self, game_id: i32) -> Result<Vec<PlayerStatLine>, StatsError> {
        let players_query = format!(
            "{} WHERE u.id IN (SELECT user_id FROM game_stats WHERE game_id = $1)",
            PLAYER_COLUMNS
        );
        let players: Vec<PlayerRow> = sqlx::query_as(&players_query)
            .bind(game_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("list_game_lines"))?;

        let stats: Vec<GameStatRow> = sqlx::query_as(
            r#"
            SELECT game_id, user_id::TEXT AS user_id, goals, assists,
                   yellow_cards, red_cards, minutes_played
            FROM game_stats
            WHERE game_id = $1
            "#,
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list_game_lines"))?;

        let players: Vec<PlayerRecord> = players.into_iter().map(PlayerRecord::from).collect();
        Ok(stats
            .into_iter()
            .filter_map(|stat| {
                let player = players.iter().find(|p| p.user_id == stat.user_id)?.clone();
                Some(PlayerStatLine {
                    player,
                    stat: stat.into(),
                })
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_user_statistics(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserStatistics>, StatsError> {
        let rows: Vec<RollupRow> = sqlx::query_as(
            r#"
            SELECT user_id::TEXT AS user_id, season, total_games, total_goals, total_assists,
                   total_yellow_cards, total_red_cards, total_minutes_played,
                   average_goals_per_game::FLOAT8 AS average_goals_per_game,
                   average_assists_per_game::FLOAT8 AS average_assists_per_game
            FROM user_statistics
            WHERE user_id::TEXT = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("get_user_statistics"))?;

        Ok(rows.into_iter().map(UserStatistics::from).collect())
    }

    #[instrument(skip(self, rollups))]
    async fn replace_user_statistics(
        &self,
        user_id: &str,
        rollups: &[UserStatistics],
    ) -> Result<(), StatsError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("replace_user_statistics"))?;

        sqlx::query("DELETE FROM user_statistics WHERE user_id::TEXT = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(store_error("replace_user_statistics"))?;

        for rollup in rollups {
            sqlx::query(
                r#"
                INSERT INTO user_statistics (user_id, season, total_games, total_goals, total_assists,
                                             total_yellow_cards, total_red_cards, total_minutes_played,
                                             average_goals_per_game, average_assists_per_game)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(user_id)
            .bind(rollup.season)
            .bind(rollup.games_played)
            .bind(rollup.total_goals)
            .bind(rollup.total_assists)
            .bind(rollup.total_yellow_cards)
            .bind(rollup.total_red_cards)
            .bind(rollup.total_minutes_played)
            .bind(rollup.average_goals_per_game)
            .bind(rollup.average_assists_per_game)
            .execute(&mut *tx)
            .await
            .map_err(store_error("replace_user_statistics"))?;
        }

        tx.commit()
            .await
            .map_err(store_error("replace_user_statistics"))?;

        debug!(user_id = %user_id, seasons = rollups.len(), "Rollups replaced in database");
        Ok(())
    }

    #[instrument(skip(self, batch))]
    async fn ingest(&self, batch: &IngestionBatch) -> Result<(), StatsError> {
        let mut tx = self.pool.begin().await.map_err(store_error("ingest"))?;

        for game in &batch.games {
            Self::upsert_game(&mut tx, game).await?;
        }
        for stat in &batch.game_stats {
            Self::upsert_game_stat(&mut tx, stat).await?;
        }

        // Dropping the transaction on an early return rolls every row back
        tx.commit().await.map_err(store_error("ingest"))?;

        debug!(
            games = batch.games.len(),
            game_stats = batch.game_stats.len(),
            "Batch committed to database"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn complete_game(
        &self,
        game_id: i32,
        home_score: i32,
        away_score: i32,
    ) -> Result<Option<GameRecord>, StatsError> {
        let result = sqlx::query(
            "UPDATE games SET status = $2, home_score = $3, away_score = $4 WHERE id = $1",
        )
        .bind(game_id)
        .bind(GameStatus::Completed.as_ref())
        .bind(home_score)
        .bind(away_score)
        .execute(&self.pool)
        .await
        .map_err(store_error("complete_game"))?;

        if result.rows_affected() == 0 {
            debug!(game_id, "Game not found for completion");
            return Ok(None);
        }

        self.find_game(game_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_filter_uses_the_utc_year() {
        assert!(SEASON_FILTER.contains("EXTRACT(YEAR FROM g.game_date AT TIME ZONE 'UTC')"));
    }
}

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    types::{
        ApiResponse, GameResultRequest, StatsQuery, DEFAULT_HISTORY_LIMIT,
        DEFAULT_LEADERBOARD_LIMIT, DEFAULT_PLAYERS_LIMIT,
    },
    BoxScore, GameHistoryEntry, GameRecord, GameStatLine, IngestionBatch, IngestionReceipt,
    PlayerStatsRow, SeasonSummary, StatisticsOverview, TeamRanking, TeamStatsSummary, TopAssister,
    TopScorer, UserStatistics, UserStatsSummary,
};
use crate::shared::{AppError, AppState};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/statistics", get(get_statistics))
        .route("/api/statistics/top-scorers", get(get_top_scorers))
        .route("/api/statistics/top-assisters", get(get_top_assisters))
        .route("/api/statistics/team-rankings", get(get_team_rankings))
        .route("/api/statistics/teams/rankings", get(get_team_rankings))
        .route("/api/statistics/players", get(get_all_players))
        .route(
            "/api/statistics/players/:player_id/games",
            get(get_player_game_history),
        )
        .route("/api/statistics/users/:user_id", get(get_user_stats))
        .route(
            "/api/statistics/users/:user_id/recompute",
            post(recompute_user_statistics),
        )
        .route("/api/statistics/teams/:team_id", get(get_team_stats))
        .route("/api/statistics/seasons/:season", get(get_season_stats))
        .route("/api/statistics/ingest", post(ingest_batch))
        .route("/api/games/:game_id/stats", get(get_game_stats))
        .route("/api/games/:game_id/box-score", get(get_box_score))
        .route("/api/games/:game_id/result", post(finalize_game))
}

/// GET /api/statistics
#[instrument(skip(state))]
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<StatisticsOverview> {
    let overview = state
        .aggregator
        .get_statistics_overview(query.user_id(), query.team_id(), query.season())
        .await;

    Ok(Json(ApiResponse::new("Statistics retrieved", overview)))
}

/// GET /api/statistics/top-scorers
#[instrument(skip(state))]
pub async fn get_top_scorers(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Vec<TopScorer>> {
    let scorers = state
        .aggregator
        .get_top_scorers(query.limit_or(DEFAULT_LEADERBOARD_LIMIT), query.season())
        .await;

    Ok(Json(ApiResponse::new("Top scorers retrieved", scorers)))
}

/// GET /api/statistics/top-assisters
#[instrument(skip(state))]
pub async fn get_top_assisters(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Vec<TopAssister>> {
    let assisters = state
        .aggregator
        .get_top_assisters(query.limit_or(DEFAULT_LEADERBOARD_LIMIT), query.season())
        .await;

    Ok(Json(ApiResponse::new("Top assisters retrieved", assisters)))
}

/// GET /api/statistics/team-rankings
#[instrument(skip(state))]
pub async fn get_team_rankings(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Vec<TeamRanking>> {
    let rankings = state.aggregator.get_team_rankings(query.season()).await;

    Ok(Json(ApiResponse::new("Team rankings retrieved", rankings)))
}

/// GET /api/statistics/players
#[instrument(skip(state))]
pub async fn get_all_players(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Vec<PlayerStatsRow>> {
    let players = state
        .aggregator
        .get_all_players_stats(query.season(), query.limit_or(DEFAULT_PLAYERS_LIMIT))
        .await;

    Ok(Json(ApiResponse::new("Player statistics retrieved", players)))
}

/// GET /api/statistics/players/:player_id/games
#[instrument(skip(state))]
pub async fn get_player_game_history(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Vec<GameHistoryEntry>> {
    let history = state
        .history
        .get_player_game_history(&player_id, query.limit_or(DEFAULT_HISTORY_LIMIT))
        .await;

    Ok(Json(ApiResponse::new("Player game history retrieved", history)))
}

/// GET /api/statistics/users/:user_id
#[instrument(skip(state))]
pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<UserStatsSummary> {
    let stats = state
        .aggregator
        .get_user_stats(&user_id, query.season())
        .await;

    Ok(Json(ApiResponse::new("User statistics retrieved", stats)))
}

/// GET /api/statistics/teams/:team_id
#[instrument(skip(state))]
pub async fn get_team_stats(
    State(state): State<AppState>,
    Path(team_id): Path<i32>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<TeamStatsSummary> {
    let stats = state
        .aggregator
        .get_team_stats(team_id, query.season())
        .await;

    Ok(Json(ApiResponse::new("Team statistics retrieved", stats)))
}

/// GET /api/statistics/seasons/:season
#[instrument(skip(state))]
pub async fn get_season_stats(
    State(state): State<AppState>,
    Path(season): Path<String>,
) -> ApiResult<SeasonSummary> {
    let season: i32 = season
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid season: {}", season)))?;

    let summary = state.aggregator.get_season_stats(season).await;

    Ok(Json(ApiResponse::new("Season statistics retrieved", summary)))
}

/// GET /api/games/:game_id/stats
#[instrument(skip(state))]
pub async fn get_game_stats(
    State(state): State<AppState>,
    Path(game_id): Path<i32>,
) -> ApiResult<Vec<GameStatLine>> {
    let lines = state.history.get_game_stats(game_id).await;

    Ok(Json(ApiResponse::new("Game statistics retrieved", lines)))
}

/// GET /api/games/:game_id/box-score
#[instrument(skip(state))]
pub async fn get_box_score(
    State(state): State<AppState>,
    Path(game_id): Path<i32>,
) -> ApiResult<BoxScore> {
    let box_score = state
        .history
        .get_box_score(game_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Game {} not found", game_id)))?;

    Ok(Json(ApiResponse::new("Box score retrieved", box_score)))
}

/// POST /api/statistics/ingest
#[instrument(skip(state, batch))]
pub async fn ingest_batch(
    State(state): State<AppState>,
    Json(batch): Json<IngestionBatch>,
) -> ApiResult<IngestionReceipt> {
    let receipt = state.ingestion.ingest(batch).await?;

    info!(
        games = receipt.games_written,
        game_stats = receipt.game_stats_written,
        "Ingestion batch accepted"
    );
    Ok(Json(ApiResponse::new("Batch ingested", receipt)))
}

/// POST /api/games/:game_id/result
#[instrument(skip(state))]
pub async fn finalize_game(
    State(state): State<AppState>,
    Path(game_id): Path<i32>,
    Json(request): Json<GameResultRequest>,
) -> ApiResult<GameRecord> {
    let game = state
        .ingestion
        .finalize_game(game_id, request.home_score, request.away_score)
        .await?;

    info!(game_id, "Game result recorded");
    Ok(Json(ApiResponse::new("Game result recorded", game)))
}

/// POST /api/statistics/users/:user_id/recompute
#[instrument(skip(state))]
pub async fn recompute_user_statistics(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<UserStatistics>> {
    let rollups = state.rollup.recompute_user_statistics(&user_id).await?;

    Ok(Json(ApiResponse::new("User statistics recomputed", rollups)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{fixture_store, AppStateBuilder, FailingGameRecordStore};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn app() -> Router {
        let state = AppStateBuilder::new()
            .with_store(Arc::new(fixture_store()))
            .build();
        routes().with_state(state)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn top_scorers_respect_limit() {
        let (status, body) = send(app(), get_request("/api/statistics/top-scorers?limit=2")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Top scorers retrieved");
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["user_id"], "user1");
        assert_eq!(data[0]["rank"], 1);
    }

    #[tokio::test]
    async fn malformed_filters_coerce_to_defaults() {
        let (status, body) = send(
            app(),
            get_request("/api/statistics/top-scorers?limit=abc&season=twenty"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn both_ranking_paths_are_served() {
        for uri in [
            "/api/statistics/team-rankings",
            "/api/statistics/teams/rankings",
        ] {
            let (status, body) = send(app(), get_request(uri)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"].as_array().unwrap().len(), 4);
        }
    }

    #[tokio::test]
    async fn overview_with_user_filter() {
        let (status, body) = send(
            app(),
            get_request("/api/statistics?user_id=user1&season=2025"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["total_goals"], 3);
        assert!(body["data"].get("top_scorers").is_none());
    }

    #[tokio::test]
    async fn season_path_must_be_numeric() {
        let (status, body) = send(app(), get_request("/api/statistics/seasons/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("abc"));

        let (status, body) = send(app(), get_request("/api/statistics/seasons/2025")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["completed_games"], 2);
    }

    #[tokio::test]
    async fn box_score_for_unknown_game_is_not_found() {
        let (status, _) = send(app(), get_request("/api/games/99/box-score")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(app(), get_request("/api/games/3/box-score")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["away_team"], "Falcons");
    }

    #[tokio::test]
    async fn game_stats_for_unknown_game_is_empty() {
        let (status, body) = send(app(), get_request("/api/games/99/stats")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ingest_rejects_invalid_rows() {
        let batch = serde_json::json!({
            "game_stats": [{
                "game_id": 1,
                "user_id": "user1",
                "goals": -2,
                "assists": 0,
                "yellow_cards": 0,
                "red_cards": 0,
                "minutes_played": 90
            }]
        });

        let (status, body) = send(app(), post_json("/api/statistics/ingest", batch)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn result_endpoint_maps_errors() {
        let score = serde_json::json!({ "home_score": 1, "away_score": 0 });

        let (status, _) = send(app(), post_json("/api/games/99/result", score.clone())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app(), post_json("/api/games/1/result", score.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let negative = serde_json::json!({ "home_score": -1, "away_score": 0 });
        let (status, body) = send(app(), post_json("/api/games/4/result", negative)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(app(), post_json("/api/games/4/result", score)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "completed");
    }

    #[tokio::test]
    async fn recompute_returns_rollup_rows() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/statistics/users/user1/recompute")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reads_fall_back_while_writes_report_unavailable() {
        let state = AppStateBuilder::new()
            .with_store(Arc::new(FailingGameRecordStore))
            .build();
        let app = routes().with_state(state);

        let (status, body) = send(app.clone(), get_request("/api/statistics/top-scorers?limit=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 5);

        let request = Request::builder()
            .method("POST")
            .uri("/api/statistics/users/user1/recompute")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

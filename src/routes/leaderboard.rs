use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::leaderboard::{GameLeaderboard, GlobalLeaderboard, LeaderboardQuery},
    error::AppError,
    services::leaderboard_service,
    state::SharedState,
};

/// Leaderboard read endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/leaderboard/global", get(global))
        .route("/leaderboard/games/{id}", get(by_session))
        .route("/leaderboard/games/by-name/{name}", get(by_name))
}

#[utoipa::path(
    get,
    path = "/leaderboard/global",
    tag = "leaderboard",
    params(LeaderboardQuery),
    responses((status = 200, description = "Global ranking", body = GlobalLeaderboard))
)]
/// Top players across every answer ever scored.
pub async fn global(
    State(state): State<SharedState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<GlobalLeaderboard>, AppError> {
    Ok(Json(
        leaderboard_service::global_leaderboard(&state, query.limit).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/leaderboard/games/{id}",
    tag = "leaderboard",
    params(("id" = u64, Path, description = "Game session id"), LeaderboardQuery),
    responses(
        (status = 200, description = "Ranking of the session participants", body = GameLeaderboard),
        (status = 404, description = "Unknown game session")
    )
)]
/// Participants of one game session ranked by their score for that game.
pub async fn by_session(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<GameLeaderboard>, AppError> {
    Ok(Json(
        leaderboard_service::session_leaderboard(&state, id, query.limit).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/leaderboard/games/by-name/{name}",
    tag = "leaderboard",
    params(("name" = String, Path, description = "Game name"), LeaderboardQuery),
    responses((status = 200, description = "Ranking for every session of that name", body = GameLeaderboard))
)]
/// Every score recorded under one game name.
pub async fn by_name(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<GameLeaderboard>, AppError> {
    Ok(Json(
        leaderboard_service::named_game_leaderboard(&state, &name, query.limit).await?,
    ))
}

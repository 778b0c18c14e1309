use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::game::{GameSessionSummary, JoinGameRequest, JoinGameResponse},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes letting students find and join game sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/join", post(join_game))
        .route("/games/by-code/{code}", get(get_game_by_code))
}

/// Join a game session through its code.
#[utoipa::path(
    post,
    path = "/games/join",
    tag = "game",
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined", body = JoinGameResponse),
        (status = 404, description = "Unknown code or user")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<JoinGameResponse>, AppError> {
    Ok(Json(game_service::join_game(&state, payload).await?))
}

/// Resolve a game session from its join code (case-insensitive).
#[utoipa::path(
    get,
    path = "/games/by-code/{code}",
    tag = "game",
    params(("code" = String, Path, description = "Join code")),
    responses(
        (status = 200, description = "Game session", body = GameSessionSummary),
        (status = 404, description = "No game session with this code")
    )
)]
pub async fn get_game_by_code(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<GameSessionSummary>, AppError> {
    Ok(Json(game_service::find_by_code(&state, &code).await?))
}

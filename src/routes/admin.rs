use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use axum_valid::Valid;

use crate::{
    dto::{
        game::{CreateGameRequest, GameSessionSummary},
        question::{
            AddQuestionRequest, BulkImportRequest, BulkImportResponse, CatalogReloadResponse,
            QuestionSummary,
        },
    },
    error::AppError,
    services::{catalog_service, game_service},
    state::SharedState,
};

/// Teacher management endpoints for the catalog and game sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/questions", post(add_question))
        .route("/admin/questions/bulk", post(import_questions))
        .route("/admin/catalog/reload", post(reload_catalog))
        .route("/admin/games", post(create_game))
}

/// Add one question to the catalog.
#[utoipa::path(
    post,
    path = "/admin/questions",
    tag = "admin",
    request_body = AddQuestionRequest,
    responses(
        (status = 201, description = "Question added", body = QuestionSummary),
        (status = 400, description = "Invalid question")
    )
)]
pub async fn add_question(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AddQuestionRequest>>,
) -> Result<(StatusCode, Json<QuestionSummary>), AppError> {
    let question = catalog_service::add_question(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Import parsed sheet rows; valid rows are kept even if others fail.
#[utoipa::path(
    post,
    path = "/admin/questions/bulk",
    tag = "admin",
    request_body = BulkImportRequest,
    responses(
        (status = 200, description = "Import report", body = BulkImportResponse),
        (status = 400, description = "Empty batch")
    )
)]
pub async fn import_questions(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<BulkImportRequest>>,
) -> Result<Json<BulkImportResponse>, AppError> {
    Ok(Json(catalog_service::import_questions(&state, payload).await?))
}

/// Reload the catalog from storage into the live session.
#[utoipa::path(
    post,
    path = "/admin/catalog/reload",
    tag = "admin",
    responses(
        (status = 200, description = "Catalog reloaded", body = CatalogReloadResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn reload_catalog(
    State(state): State<SharedState>,
) -> Result<Json<CatalogReloadResponse>, AppError> {
    let questions = catalog_service::reload_catalog(&state).await?;
    Ok(Json(CatalogReloadResponse { questions }))
}

/// Open a game session with a generated join code.
#[utoipa::path(
    post,
    path = "/admin/games",
    tag = "admin",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game session created", body = GameSessionSummary),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<(StatusCode, Json<GameSessionSummary>), AppError> {
    let game = game_service::create_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

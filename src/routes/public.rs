use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        answer::{SubmitAnswerRequest, SubmitAnswerResponse},
        question::StudentQuestion,
        session::SessionSnapshot,
        user::{UpsertUserRequest, UserSummary},
    },
    error::AppError,
    services::{answer_service, catalog_service, user_service},
    state::SharedState,
};

/// Student-facing endpoints: live session view, catalog, answers and user registration.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/questions", get(list_questions))
        .route("/answers", post(submit_answer))
        .route("/users", post(upsert_user))
}

#[utoipa::path(
    get,
    path = "/session",
    tag = "public",
    responses((status = 200, description = "Live session snapshot", body = SessionSnapshot))
)]
/// Return the current phase and, while a window is open, the live question.
pub async fn get_session(State(state): State<SharedState>) -> Json<SessionSnapshot> {
    let degraded = state.is_degraded().await;
    let session = state.session().lock().await;
    Json(SessionSnapshot::capture(&session, degraded))
}

#[utoipa::path(
    get,
    path = "/questions",
    tag = "public",
    responses(
        (status = 200, description = "Question catalog without answer keys", body = [StudentQuestion]),
        (status = 503, description = "Storage unavailable")
    )
)]
/// List the question catalog for students.
pub async fn list_questions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<StudentQuestion>>, AppError> {
    Ok(Json(catalog_service::student_questions(&state).await?))
}

#[utoipa::path(
    post,
    path = "/answers",
    tag = "public",
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = SubmitAnswerResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Unknown user, question or game session"),
        (status = 409, description = "Answer already recorded")
    )
)]
/// Record an answer and return the updated totals.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    Ok(Json(answer_service::submit_answer(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "public",
    request_body = UpsertUserRequest,
    responses(
        (status = 201, description = "User created or refreshed", body = UserSummary),
        (status = 400, description = "Invalid payload")
    )
)]
/// Create or refresh a user from the identity provider profile.
pub async fn upsert_user(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<UpsertUserRequest>>,
) -> Result<(StatusCode, Json<UserSummary>), AppError> {
    let user = user_service::upsert_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

//! Answer intake for the live WebSocket path and the REST path.
//!
//! Both paths share [`ScoringPolicy`](crate::state::scoring::ScoringPolicy). The first-correct
//! bonus only exists inside a live answer window.

use std::{sync::Arc, time::SystemTime};

use tracing::{debug, warn};

use crate::{
    dao::{
        models::{AnswerEventEntity, GameRef, ScoreDelta},
        quiz_store::QuizStore,
    },
    dto::{
        answer::{SubmitAnswerRequest, SubmitAnswerResponse},
        ws::{AnswerResult, SubmitAnswerMessage},
    },
    error::ServiceError,
    services::{leaderboard_service, user_service},
    state::{SharedState, catalog::Question, session::AnswerRejection},
};

async fn resolve_game(
    store: &Arc<dyn QuizStore>,
    game_id: Option<u64>,
) -> Result<Option<Option<GameRef>>, ServiceError> {
    let Some(game_id) = game_id else {
        return Ok(Some(None));
    };
    Ok(store
        .find_game_session(game_id)
        .await?
        .map(|game| Some(GameRef {
            id: game.id,
            name: game.name,
        })))
}

/// Score a live answer against the question currently accepting answers.
///
/// Rejections never mutate anything. The claim, the bonus and the score write happen while
/// the session lock is held, so they cannot straddle an advance.
pub async fn submit_live_answer(state: &SharedState, message: SubmitAnswerMessage) -> AnswerResult {
    let open_question = {
        let session = state.session().lock().await;
        session.open_question().map(|question| question.id)
    };
    let Some(question_id) = open_question
        .filter(|live| message.question_id.is_none_or(|requested| requested == *live))
    else {
        return AnswerRejection::NoActiveQuestion.into();
    };

    let Some(identity) = message.user_id.and_then(|identity| identity.normalized()) else {
        return AnswerRejection::MissingIdentity.into();
    };

    let store = match state.require_quiz_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(error = %err, "live answer received without storage");
            return AnswerResult::server_error();
        }
    };

    let user = match user_service::resolve_identity(&store, &identity).await {
        Ok(Some(user)) => user,
        Ok(None) => return AnswerRejection::UnknownUser.into(),
        Err(err) => {
            warn!(error = %err, "failed to resolve answer identity");
            return AnswerResult::server_error();
        }
    };

    let game = match resolve_game(&store, message.game_id).await {
        Ok(Some(game)) => game,
        Ok(None) => return AnswerRejection::UnknownGame.into(),
        Err(err) => {
            warn!(error = %err, "failed to resolve answer game session");
            return AnswerResult::server_error();
        }
    };

    let policy = state.config().scoring;
    let (result, game_id) = {
        let mut session = state.session().lock().await;
        let claim = match session.claim(user.id, question_id) {
            Ok(claim) => claim,
            Err(rejection) => return rejection.into(),
        };
        let award = session.award(&claim, &message.answer, &policy);

        let delta = ScoreDelta {
            user_id: user.id,
            points: award.points,
            correct: award.correct,
            game: game.clone(),
        };
        if let Err(err) = store.apply_score(delta).await {
            session.revert(&claim, &award);
            warn!(user_id = user.id, question_id, error = %err, "failed to persist live answer");
            return AnswerResult::server_error();
        }

        debug!(user_id = user.id, question_id, points = award.points, "live answer scored");
        (
            AnswerResult::scored(&award),
            game.map(|game| game.id),
        )
    };

    if result.is_correct() {
        leaderboard_service::spawn_global_broadcast(state);
        if let Some(game_id) = game_id {
            leaderboard_service::spawn_game_broadcast(state, game_id);
        }
    }

    result
}

/// Record an answer submitted through the REST API and return the updated totals.
pub async fn submit_answer(
    state: &SharedState,
    request: SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, ServiceError> {
    let store = state.require_quiz_store().await?;

    let user = user_service::require_user(&store, request.user_id, "user").await?;
    let question: Question = store
        .find_question(request.question_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("question `{}` not found", request.question_id))
        })?
        .into();
    let game = resolve_game(&store, request.game_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "game session `{}` not found",
                request.game_id.unwrap_or_default()
            ))
        })?;

    let is_correct = question.is_correct(&request.selected);
    let points = state.config().scoring.points(is_correct, false);
    let game_id = game.as_ref().map(|game| game.id);

    let answer = AnswerEventEntity {
        user_id: user.id,
        question_id: question.id,
        game: game.clone(),
        selected: request.selected.trim().to_string(),
        correct_answer: question.correct.clone(),
        is_correct,
        answered_at: SystemTime::now(),
    };
    let delta = ScoreDelta {
        user_id: user.id,
        points,
        correct: is_correct,
        game,
    };

    let totals = store.record_answer(answer, delta).await?.ok_or_else(|| {
        ServiceError::Conflict(format!(
            "user `{}` already answered question `{}`",
            user.id, question.id
        ))
    })?;

    if is_correct {
        leaderboard_service::spawn_global_broadcast(state);
        if let Some(game_id) = game_id {
            leaderboard_service::spawn_game_broadcast(state, game_id);
        }
    }

    Ok(SubmitAnswerResponse::new(is_correct, points, &totals))
}

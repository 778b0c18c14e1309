use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        leaderboard::{GameLeaderboard, GlobalLeaderboard},
        sse::{GameOverEvent, NewQuestionEvent, ServerEvent},
        ws::AnswerResult,
    },
    state::{SharedState, session::LiveQuestion},
};

pub const EVENT_NEW_QUESTION: &str = "new-question";
pub const EVENT_ANSWER_RESULT: &str = "answer-result";
pub const EVENT_LEADERBOARD_GLOBAL: &str = "leaderboard-global";
pub const EVENT_LEADERBOARD_GAME: &str = "leaderboard-game";
pub const EVENT_GAME_OVER: &str = "game-over";

/// Broadcast a question that just opened its answer window.
pub fn broadcast_new_question(state: &SharedState, live: &LiveQuestion) {
    let timeout_ms = state.config().question_window.as_millis() as u64;
    let payload = NewQuestionEvent::from_live(live, timeout_ms);
    send_public_event(state, EVENT_NEW_QUESTION, &payload);
}

/// Broadcast the end of the session.
pub fn broadcast_game_over(state: &SharedState, total_questions: usize) {
    let payload = GameOverEvent {
        message: "Game over! Thanks for playing.".into(),
        total_questions,
    };
    send_public_event(state, EVENT_GAME_OVER, &payload);
}

/// Broadcast a full snapshot of the global ranking.
pub fn broadcast_global_leaderboard(state: &SharedState, leaderboard: &GlobalLeaderboard) {
    send_public_event(state, EVENT_LEADERBOARD_GLOBAL, leaderboard);
}

/// Broadcast a full snapshot of one game's ranking.
pub fn broadcast_game_leaderboard(state: &SharedState, leaderboard: &GameLeaderboard) {
    send_public_event(state, EVENT_LEADERBOARD_GAME, leaderboard);
}

/// Build the unicast acknowledgement for a live answer.
pub fn answer_result_event(result: &AnswerResult) -> Option<ServerEvent> {
    match ServerEvent::json(EVENT_ANSWER_RESULT, result) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize answer result");
            None
        }
    }
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(event, payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public event payload"),
    }
}

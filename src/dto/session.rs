use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::{
    dto::question::StudentQuestion,
    state::session::{QuizSession, SessionPhase},
};

/// Phase of the live session as exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSessionPhase {
    Idle,
    QuestionLive,
    AnswerWindowClosed,
    GameOver,
}

impl From<SessionPhase> for VisibleSessionPhase {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Idle => Self::Idle,
            SessionPhase::QuestionLive(_) => Self::QuestionLive,
            SessionPhase::AnswerWindowClosed(_) => Self::AnswerWindowClosed,
            SessionPhase::GameOver => Self::GameOver,
        }
    }
}

/// Pull view of the live session for clients that missed broadcasts.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub phase: VisibleSessionPhase,
    pub accepting_answers: bool,
    /// One-based position of the current question.
    pub question_number: Option<usize>,
    pub total_questions: usize,
    pub answered_count: usize,
    pub first_answered: bool,
    /// Present while a question accepts answers.
    pub question: Option<StudentQuestion>,
    /// True when the backend operates without a storage connection.
    pub degraded: bool,
}

impl SessionSnapshot {
    pub fn capture(session: &QuizSession, degraded: bool) -> Self {
        let question_number = match session.phase() {
            SessionPhase::QuestionLive(index) | SessionPhase::AnswerWindowClosed(index) => {
                Some(index + 1)
            }
            _ => None,
        };

        Self {
            phase: session.phase().into(),
            accepting_answers: session.accepting_answers(),
            question_number,
            total_questions: session.catalog().len(),
            answered_count: session.answered_count(),
            first_answered: session.first_answered(),
            question: session.open_question().map(StudentQuestion::from),
            degraded,
        }
    }
}

//! The single live quiz session: question cursor, answer window and per-question bookkeeping.
//!
//! [`QuizSession`] is plain data. Callers serialize access through the mutex held by
//! [`AppState`](crate::state::AppState), so every method below runs as one critical section.

use std::collections::HashSet;

use thiserror::Error;

use crate::state::{catalog::Question, scoring::ScoringPolicy};

/// Phases of the shared question sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Nothing has been asked yet.
    #[default]
    Idle,
    /// Question at the given catalog index is accepting answers.
    QuestionLive(usize),
    /// Answer window for the question at the given index has closed.
    AnswerWindowClosed(usize),
    /// The catalog is exhausted; the session never restarts.
    GameOver,
}

/// Misuse of the sequencing operations.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Advance requested after the terminal state.
    #[error("the session is over")]
    Finished,
    /// Window close requested while no question is live.
    #[error("no answer window is open")]
    NoOpenWindow,
}

/// Non-fatal reasons for refusing a live answer. Rejections never mutate anything.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AnswerRejection {
    /// No question is accepting answers, or the answer targets another question.
    #[error("No active question.")]
    NoActiveQuestion,
    /// The submission carried no user identity.
    #[error("Missing user identity.")]
    MissingIdentity,
    /// The identity does not resolve to a registered user.
    #[error("Unknown user.")]
    UnknownUser,
    /// The referenced game session does not exist.
    #[error("Unknown game session.")]
    UnknownGame,
    /// The user already answered the live question.
    #[error("You already answered this question!")]
    AlreadyAnswered,
}

/// Outcome of an advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// A new question went live.
    Live(LiveQuestion),
    /// The catalog is exhausted.
    GameOver {
        /// Number of questions in the catalog when the session ended.
        total_questions: usize,
    },
}

/// Question that just opened its answer window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveQuestion {
    /// Zero-based catalog position.
    pub index: usize,
    /// Catalog length at the time of the advance.
    pub total: usize,
    /// The question itself.
    pub question: Question,
}

/// Reservation of the live question for one user, produced by [`QuizSession::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerClaim {
    round: u64,
    /// Claiming user.
    pub user_id: u64,
    /// Question the claim belongs to.
    pub question_id: u64,
    correct_answer: String,
}

/// Scoring decision for a claimed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    /// Whether the selected option matched the answer key.
    pub correct: bool,
    /// Whether this answer took the first-correct bonus.
    pub first: bool,
    /// Points to persist.
    pub points: u32,
}

/// Mutable state of the live quiz.
#[derive(Debug, Default)]
pub struct QuizSession {
    catalog: Vec<Question>,
    phase: SessionPhase,
    cursor: Option<usize>,
    live: Option<Question>,
    accepting_answers: bool,
    first_answered: bool,
    answered_users: HashSet<u64>,
    round: u64,
}

impl QuizSession {
    /// Create an idle session with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap the catalog wholesale. The live question, if any, keeps its answer key.
    pub fn replace_catalog(&mut self, questions: Vec<Question>) {
        self.catalog = questions;
    }

    /// Questions in presentation order.
    pub fn catalog(&self) -> &[Question] {
        &self.catalog
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Zero-based position of the most recent advance, `None` before the first one.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Whether the live question still takes answers.
    pub fn accepting_answers(&self) -> bool {
        self.accepting_answers
    }

    /// Whether the first-correct bonus has been claimed for the live question.
    pub fn first_answered(&self) -> bool {
        self.first_answered
    }

    /// Number of users holding a claim on the live question.
    pub fn answered_count(&self) -> usize {
        self.answered_users.len()
    }

    /// Whether `user_id` already claimed the live question.
    pub fn has_answered(&self, user_id: u64) -> bool {
        self.answered_users.contains(&user_id)
    }

    /// Question currently accepting answers.
    pub fn open_question(&self) -> Option<&Question> {
        if self.accepting_answers {
            self.live.as_ref()
        } else {
            None
        }
    }

    /// Move to the next question, clearing the per-question bookkeeping before the new
    /// window opens.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        if self.phase == SessionPhase::GameOver {
            return Err(SessionError::Finished);
        }

        self.accepting_answers = false;
        self.answered_users.clear();
        self.first_answered = false;
        self.round += 1;

        let next = self.cursor.map_or(0, |index| index + 1);
        self.cursor = Some(next);

        let Some(question) = self.catalog.get(next).cloned() else {
            self.live = None;
            self.phase = SessionPhase::GameOver;
            return Ok(Advance::GameOver {
                total_questions: self.catalog.len(),
            });
        };

        self.live = Some(question.clone());
        self.phase = SessionPhase::QuestionLive(next);
        self.accepting_answers = true;

        Ok(Advance::Live(LiveQuestion {
            index: next,
            total: self.catalog.len(),
            question,
        }))
    }

    /// Stop accepting answers for the live question.
    pub fn close_window(&mut self) -> Result<usize, SessionError> {
        match self.phase {
            SessionPhase::QuestionLive(index) => {
                self.accepting_answers = false;
                self.phase = SessionPhase::AnswerWindowClosed(index);
                Ok(index)
            }
            SessionPhase::GameOver => Err(SessionError::Finished),
            _ => Err(SessionError::NoOpenWindow),
        }
    }

    /// Reserve the live question `question_id` for `user_id`.
    pub fn claim(&mut self, user_id: u64, question_id: u64) -> Result<AnswerClaim, AnswerRejection> {
        let Some(live) = self.open_question() else {
            return Err(AnswerRejection::NoActiveQuestion);
        };
        if live.id != question_id {
            return Err(AnswerRejection::NoActiveQuestion);
        }
        let correct_answer = live.correct.clone();

        if !self.answered_users.insert(user_id) {
            return Err(AnswerRejection::AlreadyAnswered);
        }

        Ok(AnswerClaim {
            round: self.round,
            user_id,
            question_id,
            correct_answer,
        })
    }

    /// Score a claimed answer, taking the first-correct bonus when still available.
    pub fn award(&mut self, claim: &AnswerClaim, selected: &str, policy: &ScoringPolicy) -> Award {
        let correct = selected.trim() == claim.correct_answer.trim();
        let first = correct && claim.round == self.round && !self.first_answered;
        if first {
            self.first_answered = true;
        }

        Award {
            correct,
            first,
            points: policy.points(correct, first),
        }
    }

    /// Undo a claim whose score could not be persisted.
    pub fn revert(&mut self, claim: &AnswerClaim, award: &Award) {
        if claim.round != self.round {
            return;
        }
        self.answered_users.remove(&claim.user_id);
        if award.first {
            self.first_answered = false;
        }
    }
}

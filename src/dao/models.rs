use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Multiple-choice question persisted in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Store-assigned identifier, increasing in insertion order.
    pub id: u64,
    /// Prompt shown to players.
    pub text: String,
    /// Text of option A.
    pub option_a: String,
    /// Text of option B.
    pub option_b: String,
    /// Text of option C.
    pub option_c: String,
    /// Text of option D.
    pub option_d: String,
    /// Text of the correct option (always equal to one of the four options).
    pub correct: String,
    /// Free-form difficulty label.
    pub difficulty: String,
}

/// Question payload before the store assigns an identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewQuestionEntity {
    /// Prompt shown to players.
    pub text: String,
    /// Text of option A.
    pub option_a: String,
    /// Text of option B.
    pub option_b: String,
    /// Text of option C.
    pub option_c: String,
    /// Text of option D.
    pub option_d: String,
    /// Text of the correct option.
    pub correct: String,
    /// Free-form difficulty label.
    pub difficulty: String,
}

impl NewQuestionEntity {
    /// Attach a store-assigned identifier.
    pub fn with_id(self, id: u64) -> QuestionEntity {
        QuestionEntity {
            id,
            text: self.text,
            option_a: self.option_a,
            option_b: self.option_b,
            option_c: self.option_c,
            option_d: self.option_d,
            correct: self.correct,
            difficulty: self.difficulty,
        }
    }
}

/// Registered user. Resolvable either by numeric id or by external provider uid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Primary numeric identifier.
    pub id: u64,
    /// Identifier issued by the external identity provider.
    pub uid: String,
    /// Optional e-mail address.
    pub email: Option<String>,
    /// Optional display name.
    pub display_name: Option<String>,
}

/// Data used to create or refresh a user keyed by its external uid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUserEntity {
    /// Identifier issued by the external identity provider.
    pub uid: String,
    /// Optional e-mail address.
    pub email: Option<String>,
    /// Optional display name.
    pub display_name: Option<String>,
}

/// Running totals shared by the global and per-game aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreAggregate {
    /// Cumulative points.
    pub score: u64,
    /// Number of scored submissions.
    pub attempts: u64,
    /// Number of correct submissions.
    pub correct: u64,
    /// `correct / attempts * 100`, `0` without attempts.
    pub accuracy: f64,
    /// Time of the last scored submission.
    pub last_update: Option<SystemTime>,
}

impl ScoreAggregate {
    /// Fold one scored submission into the totals and recompute accuracy.
    pub fn record(&mut self, points: u32, correct: bool, at: SystemTime) {
        self.score += u64::from(points);
        self.attempts += 1;
        if correct {
            self.correct += 1;
        }
        self.accuracy = accuracy_percent(self.correct, self.attempts);
        self.last_update = Some(at);
    }
}

/// Percentage of correct answers, `0` when nothing was attempted.
pub fn accuracy_percent(correct: u64, attempts: u64) -> f64 {
    if attempts == 0 {
        0.0
    } else {
        correct as f64 / attempts as f64 * 100.0
    }
}

/// Global per-user performance aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceEntity {
    /// Owner of the aggregate.
    pub user_id: u64,
    /// Running totals.
    #[serde(flatten)]
    pub totals: ScoreAggregate,
}

/// Per-(user, game name) aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameScoreEntity {
    /// Owner of the aggregate.
    pub user_id: u64,
    /// Name of the game the totals are scoped to.
    pub game_name: String,
    /// Running totals.
    #[serde(flatten)]
    pub totals: ScoreAggregate,
}

/// Reference to the game session an answer is tied to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRef {
    /// Game session identifier.
    pub id: u64,
    /// Game session name, the key of the per-game aggregate.
    pub name: String,
}

/// Additive update applied to a user's aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreDelta {
    /// User receiving the points.
    pub user_id: u64,
    /// Points to add.
    pub points: u32,
    /// Whether the submission was correct.
    pub correct: bool,
    /// Game session the submission belongs to, if any.
    pub game: Option<GameRef>,
}

/// Aggregates after a score delta has been committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTotals {
    /// Updated global aggregate.
    pub performance: PerformanceEntity,
    /// Updated per-game aggregate when the delta was tied to a game.
    pub game: Option<GameScoreEntity>,
}

/// Immutable answer event recorded by the REST submission path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEventEntity {
    /// Submitting user.
    pub user_id: u64,
    /// Answered question.
    pub question_id: u64,
    /// Game session the answer belongs to, if any.
    pub game: Option<GameRef>,
    /// Option text chosen by the user.
    pub selected: String,
    /// Answer key at the time of submission.
    pub correct_answer: String,
    /// Whether `selected` matched the answer key.
    pub is_correct: bool,
    /// Submission time.
    pub answered_at: SystemTime,
}

/// Teacher-created game addressed by a join code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSessionEntity {
    /// Store-assigned identifier.
    pub id: u64,
    /// Display name, also the key of per-game aggregates.
    pub name: String,
    /// Owning teacher.
    pub teacher_id: u64,
    /// Upper-case join code.
    pub code: String,
    /// Creation time.
    pub created_at: SystemTime,
}

/// Game session payload before the store assigns an identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewGameSessionEntity {
    /// Display name.
    pub name: String,
    /// Owning teacher.
    pub teacher_id: u64,
    /// Upper-case join code.
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_and_recomputes_accuracy() {
        let mut totals = ScoreAggregate::default();
        let now = SystemTime::now();

        totals.record(15, true, now);
        totals.record(0, false, now);
        totals.record(10, true, now);

        assert_eq!(totals.score, 25);
        assert_eq!(totals.attempts, 3);
        assert_eq!(totals.correct, 2);
        assert!((totals.accuracy - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(totals.last_update, Some(now));
    }

    #[test]
    fn accuracy_is_zero_without_attempts() {
        assert_eq!(accuracy_percent(0, 0), 0.0);
        assert_eq!(accuracy_percent(1, 4), 25.0);
    }
}

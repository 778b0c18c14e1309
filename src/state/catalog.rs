use indexmap::IndexMap;

use crate::dao::models::QuestionEntity;

/// Labels of the four options, in display order.
pub const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

/// Runtime representation of a catalog question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Stable identifier assigned by the store.
    pub id: u64,
    /// Prompt shown to players.
    pub text: String,
    /// Option texts keyed by their label (`A`..`D`).
    pub options: IndexMap<String, String>,
    /// Text of the correct option. Never leaves the server while the question is live.
    pub correct: String,
    /// Difficulty label.
    pub difficulty: String,
}

impl Question {
    /// Compare a submitted option text against the answer key.
    pub fn is_correct(&self, selected: &str) -> bool {
        selected.trim() == self.correct.trim()
    }
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        let options = OPTION_LABELS
            .iter()
            .map(|label| label.to_string())
            .zip([
                value.option_a,
                value.option_b,
                value.option_c,
                value.option_d,
            ])
            .collect();

        Self {
            id: value.id,
            text: value.text,
            options,
            correct: value.correct,
            difficulty: value.difficulty,
        }
    }
}

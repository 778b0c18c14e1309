use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::state::session::LiveQuestion;

#[derive(Clone, Debug, Serialize)]
/// Dispatched payload carried across the SSE and WebSocket transports.
pub struct ServerEvent {
    pub event: String,
    pub data: Value,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the event data field.
    pub fn json<T>(event: impl Into<String>, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_value(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Broadcast when a question opens its answer window. Never carries the answer key.
pub struct NewQuestionEvent {
    pub id: u64,
    pub text: String,
    #[schema(value_type = Object)]
    pub options: IndexMap<String, String>,
    pub difficulty: String,
    /// One-based position in the catalog.
    pub question_number: usize,
    pub total_questions: usize,
    /// Length of the answer window.
    pub timeout_ms: u64,
}

impl NewQuestionEvent {
    pub fn from_live(live: &LiveQuestion, timeout_ms: u64) -> Self {
        Self {
            id: live.question.id,
            text: live.question.text.clone(),
            options: live.question.options.clone(),
            difficulty: live.question.difficulty.clone(),
            question_number: live.index + 1,
            total_questions: live.total,
            timeout_ms,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once when the catalog is exhausted.
pub struct GameOverEvent {
    pub message: String,
    pub total_questions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::catalog::Question;

    #[test]
    fn new_question_event_hides_the_answer_key() {
        let live = LiveQuestion {
            index: 0,
            total: 3,
            question: Question {
                id: 9,
                text: "2 + 2?".into(),
                options: [("A", "3"), ("B", "4"), ("C", "5"), ("D", "22")]
                    .into_iter()
                    .map(|(label, text)| (label.to_string(), text.to_string()))
                    .collect(),
                correct: "4".into(),
                difficulty: "Easy".into(),
            },
        };

        let event =
            ServerEvent::json("new-question", &NewQuestionEvent::from_live(&live, 30_000)).unwrap();

        assert_eq!(event.event, "new-question");
        assert_eq!(event.data["question_number"], 1);
        assert_eq!(event.data["total_questions"], 3);
        assert_eq!(event.data["options"]["B"], "4");
        assert!(event.data.get("correct").is_none());
    }
}

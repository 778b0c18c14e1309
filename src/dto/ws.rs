use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::session::{AnswerRejection, Award};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
/// User identity as sent by clients: the numeric id or the external provider uid.
///
/// Any other JSON value is kept as [`IdentityInput::Other`] so the submission can still be
/// acknowledged; it never resolves to a user.
pub enum IdentityInput {
    Id(u64),
    Uid(String),
    Other(serde_json::Value),
}

impl IdentityInput {
    /// Drop blank uids so they count as a missing identity.
    pub fn normalized(self) -> Option<Self> {
        match self {
            Self::Uid(uid) => {
                let trimmed = uid.trim();
                (!trimmed.is_empty()).then(|| Self::Uid(trimmed.to_string()))
            }
            id => Some(id),
        }
    }
}

impl fmt::Display for IdentityInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Uid(uid) => f.write_str(uid),
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
/// Live answer submitted over the WebSocket.
pub struct SubmitAnswerMessage {
    #[serde(default)]
    pub user_id: Option<IdentityInput>,
    /// Text of the selected option.
    #[serde(default)]
    pub answer: String,
    /// Question the client believes is live.
    #[serde(default)]
    pub question_id: Option<u64>,
    /// Game session the answer counts towards.
    #[serde(default)]
    pub game_id: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from quiz WebSocket clients.
#[serde(tag = "type")]
pub enum ClientInboundMessage {
    #[serde(rename = "submit-answer")]
    SubmitAnswer(SubmitAnswerMessage),
    #[serde(other)]
    Unknown,
}

impl ClientInboundMessage {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Machine-readable outcome of a live answer.
pub enum AnswerOutcome {
    FirstCorrect,
    Correct,
    Wrong,
    NoActiveQuestion,
    MissingIdentity,
    UnknownUser,
    UnknownGame,
    AlreadyAnswered,
    ServerError,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
/// Unicast acknowledgement of a live answer.
pub struct AnswerResult {
    pub outcome: AnswerOutcome,
    pub message: String,
    pub points: u32,
}

impl AnswerResult {
    pub fn scored(award: &Award) -> Self {
        let (outcome, message) = match (award.correct, award.first) {
            (true, true) => (
                AnswerOutcome::FirstCorrect,
                format!("First Correct! +{} points", award.points),
            ),
            (true, false) => (
                AnswerOutcome::Correct,
                format!("Correct! +{} points", award.points),
            ),
            (false, _) => (AnswerOutcome::Wrong, "Wrong!".to_string()),
        };
        Self {
            outcome,
            message,
            points: award.points,
        }
    }

    pub fn server_error() -> Self {
        Self {
            outcome: AnswerOutcome::ServerError,
            message: "Server error processing answer.".into(),
            points: 0,
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(
            self.outcome,
            AnswerOutcome::FirstCorrect | AnswerOutcome::Correct
        )
    }
}

impl From<AnswerRejection> for AnswerResult {
    fn from(rejection: AnswerRejection) -> Self {
        let outcome = match rejection {
            AnswerRejection::NoActiveQuestion => AnswerOutcome::NoActiveQuestion,
            AnswerRejection::MissingIdentity => AnswerOutcome::MissingIdentity,
            AnswerRejection::UnknownUser => AnswerOutcome::UnknownUser,
            AnswerRejection::UnknownGame => AnswerOutcome::UnknownGame,
            AnswerRejection::AlreadyAnswered => AnswerOutcome::AlreadyAnswered,
        };
        Self {
            outcome,
            message: rejection.to_string(),
            points: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_answer_accepts_numeric_and_uid_identities() {
        let numeric = ClientInboundMessage::from_json_str(
            r#"{"type":"submit-answer","user_id":42,"answer":"Paris","question_id":3}"#,
        )
        .unwrap();
        let ClientInboundMessage::SubmitAnswer(numeric) = numeric else {
            panic!("expected submit-answer");
        };
        assert_eq!(numeric.user_id, Some(IdentityInput::Id(42)));
        assert_eq!(numeric.question_id, Some(3));

        let uid = ClientInboundMessage::from_json_str(
            r#"{"type":"submit-answer","user_id":"firebase-abc","answer":"Paris","game_id":7}"#,
        )
        .unwrap();
        let ClientInboundMessage::SubmitAnswer(uid) = uid else {
            panic!("expected submit-answer");
        };
        assert_eq!(uid.user_id, Some(IdentityInput::Uid("firebase-abc".into())));
        assert_eq!(uid.game_id, Some(7));
    }

    #[test]
    fn malformed_identities_still_parse() {
        for raw in ["-5", "3.5", "true", "[1]"] {
            let text = format!(r#"{{"type":"submit-answer","user_id":{raw},"answer":"x"}}"#);
            let message = ClientInboundMessage::from_json_str(&text).unwrap();
            let ClientInboundMessage::SubmitAnswer(submission) = message else {
                panic!("expected submit-answer for {raw}");
            };
            assert!(
                matches!(submission.user_id, Some(IdentityInput::Other(_))),
                "{raw} should be kept as an unresolvable identity"
            );
        }

        let null = ClientInboundMessage::from_json_str(
            r#"{"type":"submit-answer","user_id":null,"answer":"x"}"#,
        )
        .unwrap();
        let ClientInboundMessage::SubmitAnswer(null) = null else {
            panic!("expected submit-answer");
        };
        assert_eq!(null.user_id, None);
    }

    #[test]
    fn unknown_message_types_are_tolerated() {
        let message = ClientInboundMessage::from_json_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(message, ClientInboundMessage::Unknown));
    }

    #[test]
    fn blank_uid_counts_as_missing() {
        assert_eq!(IdentityInput::Uid("   ".into()).normalized(), None);
        assert_eq!(
            IdentityInput::Uid(" abc ".into()).normalized(),
            Some(IdentityInput::Uid("abc".into()))
        );
    }

    #[test]
    fn result_messages_follow_the_award() {
        let first = AnswerResult::scored(&Award {
            correct: true,
            first: true,
            points: 15,
        });
        assert_eq!(first.message, "First Correct! +15 points");

        let late = AnswerResult::scored(&Award {
            correct: true,
            first: false,
            points: 10,
        });
        assert_eq!(late.message, "Correct! +10 points");

        let rejected: AnswerResult = AnswerRejection::AlreadyAnswered.into();
        assert_eq!(rejected.message, "You already answered this question!");
        assert_eq!(rejected.outcome, AnswerOutcome::AlreadyAnswered);
    }
}

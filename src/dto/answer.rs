use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{ScoreAggregate, ScoreTotals},
    dto::{format_system_time, validation::validate_not_blank, ws::IdentityInput},
};

/// Answer submitted outside of the live window through the REST API.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    /// Numeric user id or external uid.
    pub user_id: IdentityInput,
    pub question_id: u64,
    /// Text of the selected option.
    #[validate(custom(function = "validate_not_blank"))]
    pub selected: String,
    #[serde(default)]
    pub game_id: Option<u64>,
}

/// Running totals as exposed to clients.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreSummary {
    pub score: u64,
    pub attempts: u64,
    pub correct: u64,
    pub accuracy: f64,
    pub last_update: Option<String>,
}

impl From<&ScoreAggregate> for ScoreSummary {
    fn from(value: &ScoreAggregate) -> Self {
        Self {
            score: value.score,
            attempts: value.attempts,
            correct: value.correct,
            accuracy: value.accuracy,
            last_update: value.last_update.map(format_system_time),
        }
    }
}

/// Totals returned synchronously after a REST answer was recorded.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    pub points: u32,
    pub performance: ScoreSummary,
    /// Per-game totals when the answer was tied to a game session.
    pub game_score: Option<ScoreSummary>,
}

impl SubmitAnswerResponse {
    pub fn new(is_correct: bool, points: u32, totals: &ScoreTotals) -> Self {
        Self {
            is_correct,
            points,
            performance: ScoreSummary::from(&totals.performance.totals),
            game_score: totals
                .game
                .as_ref()
                .map(|game| ScoreSummary::from(&game.totals)),
        }
    }
}

use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{
    AnswerEventEntity, GameScoreEntity, GameSessionEntity, PerformanceEntity, QuestionEntity,
    ScoreAggregate, UserEntity,
};

/// BSON has no unsigned 64-bit integer; identifiers and counters are stored as `i64`.
pub fn to_bson_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub fn from_bson_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCounterDocument {
    #[serde(rename = "_id")]
    pub name: String,
    pub seq: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct: String,
    pub difficulty: String,
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: to_bson_int(value.id),
            text: value.text,
            option_a: value.option_a,
            option_b: value.option_b,
            option_c: value.option_c,
            option_d: value.option_d,
            correct: value.correct,
            difficulty: value.difficulty,
        }
    }
}

impl From<MongoQuestionDocument> for QuestionEntity {
    fn from(value: MongoQuestionDocument) -> Self {
        Self {
            id: from_bson_int(value.id),
            text: value.text,
            option_a: value.option_a,
            option_b: value.option_b,
            option_c: value.option_c,
            option_d: value.option_d,
            correct: value.correct,
            difficulty: value.difficulty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: from_bson_int(value.id),
            uid: value.uid,
            email: value.email,
            display_name: value.display_name,
        }
    }
}

/// Aggregate fields shared by the performance and game score collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MongoTotals {
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub correct: i64,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub last_update: Option<DateTime>,
}

impl From<MongoTotals> for ScoreAggregate {
    fn from(value: MongoTotals) -> Self {
        Self {
            score: from_bson_int(value.score),
            attempts: from_bson_int(value.attempts),
            correct: from_bson_int(value.correct),
            accuracy: value.accuracy,
            last_update: value.last_update.map(DateTime::to_system_time),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPerformanceDocument {
    #[serde(rename = "_id")]
    pub user_id: i64,
    #[serde(flatten)]
    pub totals: MongoTotals,
}

impl From<MongoPerformanceDocument> for PerformanceEntity {
    fn from(value: MongoPerformanceDocument) -> Self {
        Self {
            user_id: from_bson_int(value.user_id),
            totals: value.totals.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameScoreDocument {
    pub user_id: i64,
    pub game_name: String,
    #[serde(flatten)]
    pub totals: MongoTotals,
}

impl From<MongoGameScoreDocument> for GameScoreEntity {
    fn from(value: MongoGameScoreDocument) -> Self {
        Self {
            user_id: from_bson_int(value.user_id),
            game_name: value.game_name,
            totals: value.totals.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAnswerDocument {
    pub user_id: i64,
    pub question_id: i64,
    pub game_id: Option<i64>,
    pub game_name: Option<String>,
    pub selected: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub answered_at: DateTime,
}

impl From<AnswerEventEntity> for MongoAnswerDocument {
    fn from(value: AnswerEventEntity) -> Self {
        let (game_id, game_name) = match value.game {
            Some(game) => (Some(to_bson_int(game.id)), Some(game.name)),
            None => (None, None),
        };
        Self {
            user_id: to_bson_int(value.user_id),
            question_id: to_bson_int(value.question_id),
            game_id,
            game_name,
            selected: value.selected,
            correct_answer: value.correct_answer,
            is_correct: value.is_correct,
            answered_at: DateTime::from_system_time(value.answered_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameSessionDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub teacher_id: i64,
    pub code: String,
    pub created_at: DateTime,
}

impl From<GameSessionEntity> for MongoGameSessionDocument {
    fn from(value: GameSessionEntity) -> Self {
        Self {
            id: to_bson_int(value.id),
            name: value.name,
            teacher_id: to_bson_int(value.teacher_id),
            code: value.code,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoGameSessionDocument> for GameSessionEntity {
    fn from(value: MongoGameSessionDocument) -> Self {
        Self {
            id: from_bson_int(value.id),
            name: value.name,
            teacher_id: from_bson_int(value.teacher_id),
            code: value.code,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    pub game_id: i64,
    pub user_id: i64,
    pub joined_at: DateTime,
}

/// Update pipeline adding one scored submission and recomputing accuracy from the new totals.
pub fn aggregate_update(points: u32, correct: bool, at: DateTime) -> Vec<Document> {
    let correct_increment: i64 = if correct { 1 } else { 0 };
    vec![
        doc! {
            "$set": {
                "score": { "$add": [{ "$ifNull": ["$score", 0_i64] }, i64::from(points)] },
                "attempts": { "$add": [{ "$ifNull": ["$attempts", 0_i64] }, 1_i64] },
                "correct": { "$add": [{ "$ifNull": ["$correct", 0_i64] }, correct_increment] },
                "last_update": at,
            }
        },
        doc! {
            "$set": {
                "accuracy": { "$multiply": [{ "$divide": ["$correct", "$attempts"] }, 100.0] },
            }
        },
    ]
}

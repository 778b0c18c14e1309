//! DTOs for teacher-created game sessions and student participation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::GameSessionEntity,
    dto::{
        format_system_time,
        validation::{validate_game_code, validate_not_blank},
        ws::IdentityInput,
    },
};

/// Payload used by a teacher to open a new game session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 100, message = "Game name must be at most 100 characters")
    )]
    pub name: String,
    /// Numeric user id or external uid of the owning teacher.
    pub teacher_id: IdentityInput,
}

/// Request sent by a student to join a game through its code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinGameRequest {
    /// Numeric user id or external uid.
    pub user_id: IdentityInput,
    #[validate(custom(function = "validate_game_code"))]
    pub code: String,
}

/// Summary returned once a game session has been created or resolved.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameSessionSummary {
    pub id: u64,
    pub name: String,
    pub teacher_id: u64,
    pub code: String,
    pub created_at: String,
}

impl From<GameSessionEntity> for GameSessionSummary {
    fn from(value: GameSessionEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            teacher_id: value.teacher_id,
            code: value.code,
            created_at: format_system_time(value.created_at),
        }
    }
}

/// Acknowledgement of a join.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinGameResponse {
    pub game: GameSessionSummary,
    pub user_id: u64,
    /// Number of registered participants after the join.
    pub participants: usize,
}

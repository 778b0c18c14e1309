use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{NewUserEntity, UserEntity},
    dto::validation::validate_not_blank,
};

/// Create or refresh a user identified by its external provider uid.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpsertUserRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 128, message = "uid must be at most 128 characters")
    )]
    pub uid: String,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
}

impl From<UpsertUserRequest> for NewUserEntity {
    fn from(value: UpsertUserRequest) -> Self {
        Self {
            uid: value.uid.trim().to_string(),
            email: value.email,
            display_name: value
                .display_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        }
    }
}

/// Public projection of a user.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: u64,
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<UserEntity> for UserSummary {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            uid: value.uid,
            email: value.email,
            display_name: value.display_name,
        }
    }
}

use std::sync::Arc;

use tracing::info;

use crate::{
    dao::{models::UserEntity, quiz_store::QuizStore, storage::StorageResult},
    dto::{
        user::{UpsertUserRequest, UserSummary},
        ws::IdentityInput,
    },
    error::ServiceError,
    state::SharedState,
};

/// Create or refresh a user keyed by its external uid.
pub async fn upsert_user(
    state: &SharedState,
    request: UpsertUserRequest,
) -> Result<UserSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let user = store.upsert_user(request.into()).await?;
    info!(user_id = user.id, uid = %user.uid, "user upserted");
    Ok(user.into())
}

/// Resolve an identity sent by a client to a registered user.
///
/// Every identity is first tried as a positive numeric id (a uid made of digits included),
/// then as an external uid. So when uid `"5"` belongs to user 9 while user 5 exists, `"5"`
/// resolves to user 5. Identities that are neither a number nor a string never resolve.
pub async fn resolve_identity(
    store: &Arc<dyn QuizStore>,
    identity: &IdentityInput,
) -> StorageResult<Option<UserEntity>> {
    let (numeric, uid) = match identity {
        IdentityInput::Id(id) => (Some(*id), id.to_string()),
        IdentityInput::Uid(uid) => (uid.trim().parse::<u64>().ok(), uid.trim().to_string()),
        IdentityInput::Other(_) => return Ok(None),
    };

    if let Some(id) = numeric.filter(|id| *id > 0) {
        if let Some(user) = store.find_user(id).await? {
            return Ok(Some(user));
        }
    }
    store.find_user_by_uid(uid).await
}

/// Resolve an identity or fail with [`ServiceError::NotFound`].
pub async fn require_user(
    store: &Arc<dyn QuizStore>,
    identity: IdentityInput,
    role: &str,
) -> Result<UserEntity, ServiceError> {
    let Some(identity) = identity.normalized() else {
        return Err(ServiceError::InvalidInput(format!("{role} identity is required")));
    };
    resolve_identity(store, &identity)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{role} `{identity}` not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dao::models::NewUserEntity, dao::quiz_store::memory::InMemoryQuizStore};

    #[tokio::test]
    async fn identities_resolve_by_id_uid_and_numeric_string() {
        let memory = InMemoryQuizStore::new();
        let store: Arc<dyn QuizStore> = Arc::new(memory);
        let user = store
            .upsert_user(NewUserEntity {
                uid: "firebase-1".into(),
                email: Some("ada@example.com".into()),
                display_name: None,
            })
            .await
            .unwrap();

        let by_id = resolve_identity(&store, &IdentityInput::Id(user.id)).await;
        let by_uid = resolve_identity(&store, &IdentityInput::Uid("firebase-1".into())).await;
        let by_text_id = resolve_identity(&store, &IdentityInput::Uid(user.id.to_string())).await;
        let unknown = resolve_identity(&store, &IdentityInput::Uid("ghost".into())).await;

        assert_eq!(by_id.unwrap().map(|u| u.id), Some(user.id));
        assert_eq!(by_uid.unwrap().map(|u| u.id), Some(user.id));
        assert_eq!(by_text_id.unwrap().map(|u| u.id), Some(user.id));
        assert!(unknown.unwrap().is_none());
    }

    #[tokio::test]
    async fn numeric_ids_win_over_digit_uids() {
        let store: Arc<dyn QuizStore> = Arc::new(InMemoryQuizStore::new());
        let upsert = |uid: &str| {
            let store = store.clone();
            let uid = uid.to_string();
            async move {
                store
                    .upsert_user(NewUserEntity {
                        uid,
                        email: None,
                        display_name: None,
                    })
                    .await
                    .unwrap()
            }
        };
        let first = upsert("alpha").await;
        let second = upsert(&first.id.to_string()).await;
        let digits = upsert("77").await;

        let by_text = resolve_identity(&store, &IdentityInput::Uid(first.id.to_string()))
            .await
            .unwrap();
        assert_eq!(by_text.map(|u| u.id), Some(first.id));
        assert_ne!(second.id, first.id);

        let by_number = resolve_identity(&store, &IdentityInput::Id(77)).await.unwrap();
        assert_eq!(by_number.map(|u| u.id), Some(digits.id));

        let other = resolve_identity(&store, &IdentityInput::Other(serde_json::json!(-5)))
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn require_user_maps_misses_to_not_found() {
        let store: Arc<dyn QuizStore> = Arc::new(InMemoryQuizStore::new());
        let missing = require_user(&store, IdentityInput::Uid("ghost".into()), "user").await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let blank = require_user(&store, IdentityInput::Uid("  ".into()), "user").await;
        assert!(matches!(blank, Err(ServiceError::InvalidInput(_))));
    }
}

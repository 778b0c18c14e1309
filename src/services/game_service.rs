//! Teacher-created game sessions: join code issuance, lookup and participation.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use rand::seq::IndexedRandom;
use tracing::{info, warn};

use crate::{
    config::GameCodeConfig,
    dao::{models::NewGameSessionEntity, quiz_store::QuizStore},
    dto::game::{CreateGameRequest, GameSessionSummary, JoinGameRequest, JoinGameResponse},
    error::ServiceError,
    services::{leaderboard_service, user_service},
    state::SharedState,
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const FALLBACK_PREFIX: &str = "WW";
/// Creation retries when another request grabbed the same code in between.
const CREATE_ATTEMPTS: u32 = 3;

/// Random code over `A-Z0-9`.
pub fn random_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| CODE_ALPHABET.choose(&mut rng).map(|byte| char::from(*byte)))
        .collect()
}

/// Timestamp-derived code used when random candidates keep colliding.
pub fn fallback_code(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("{FALLBACK_PREFIX}{:04}", millis % 10_000)
}

/// Canonical form of a user-typed code.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Pick a code that is not used yet, trying `max_attempts` candidates before falling back.
pub async fn issue_code<F>(
    store: &Arc<dyn QuizStore>,
    config: &GameCodeConfig,
    mut candidate: F,
) -> Result<String, ServiceError>
where
    F: FnMut() -> String,
{
    for attempt in 1..=config.max_attempts {
        let code = normalize_code(&candidate());
        if !store.game_code_exists(code.clone()).await? {
            return Ok(code);
        }
        warn!(attempt, code = %code, "game code collision");
    }

    let code = fallback_code(SystemTime::now());
    warn!(code = %code, "game code attempts exhausted; using timestamp code");
    Ok(code)
}

/// Create a game session with a freshly issued join code.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameSessionSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let teacher = user_service::require_user(&store, request.teacher_id, "teacher").await?;
    let config = state.config().game_codes;
    let name = request.name.trim().to_string();

    let mut attempt = 0;
    loop {
        attempt += 1;
        let code = issue_code(&store, &config, || random_code(config.length)).await?;
        let result = store
            .create_game_session(NewGameSessionEntity {
                name: name.clone(),
                teacher_id: teacher.id,
                code,
            })
            .await;

        match result {
            Ok(game) => {
                info!(game_id = game.id, code = %game.code, "game session created");
                return Ok(game.into());
            }
            Err(err) => match ServiceError::from(err) {
                ServiceError::Conflict(message) if attempt < CREATE_ATTEMPTS => {
                    warn!(attempt, %message, "game code taken concurrently; retrying");
                }
                other => return Err(other),
            },
        }
    }
}

/// Resolve a game session from its join code, case-insensitively.
pub async fn find_by_code(
    state: &SharedState,
    code: &str,
) -> Result<GameSessionSummary, ServiceError> {
    let code = normalize_code(code);
    let store = state.require_quiz_store().await?;
    store
        .find_game_session_by_code(code.clone())
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("no game session with code `{code}`")))
}

/// Register a student in a game session and refresh that game's leaderboard.
pub async fn join_game(
    state: &SharedState,
    request: JoinGameRequest,
) -> Result<JoinGameResponse, ServiceError> {
    let code = normalize_code(&request.code);
    let store = state.require_quiz_store().await?;

    let game = store
        .find_game_session_by_code(code.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no game session with code `{code}`")))?;
    let user = user_service::require_user(&store, request.user_id, "user").await?;

    store.add_participant(game.id, user.id).await?;
    let participants = store.list_participants(game.id).await?.len();
    info!(game_id = game.id, user_id = user.id, "user joined game session");

    leaderboard_service::spawn_game_broadcast(state, game.id);

    Ok(JoinGameResponse {
        game: game.into(),
        user_id: user.id,
        participants,
    })
}

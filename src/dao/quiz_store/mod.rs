pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    AnswerEventEntity, GameScoreEntity, GameSessionEntity, NewGameSessionEntity,
    NewQuestionEntity, NewUserEntity, PerformanceEntity, QuestionEntity, ScoreDelta, ScoreTotals,
    UserEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for questions, users, scores and game sessions.
///
/// Every write method is one atomic unit: either all of its effects are visible or none are.
pub trait QuizStore: Send + Sync {
    /// Full question catalog ordered by identifier.
    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    fn find_question(&self, id: u64) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// Insert the given questions in order, returning them with their identifiers.
    fn insert_questions(
        &self,
        questions: Vec<NewQuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;

    /// Create or refresh the user keyed by `uid`, making sure a performance row exists.
    fn upsert_user(&self, user: NewUserEntity) -> BoxFuture<'static, StorageResult<UserEntity>>;
    fn find_user(&self, id: u64) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_user_by_uid(&self, uid: String)
    -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;

    fn list_performance(&self) -> BoxFuture<'static, StorageResult<Vec<PerformanceEntity>>>;
    fn list_game_scores(
        &self,
        game_name: String,
    ) -> BoxFuture<'static, StorageResult<Vec<GameScoreEntity>>>;
    /// Add the delta to the performance aggregate and, when tied to a game, to the game
    /// aggregate while registering the participation.
    fn apply_score(&self, delta: ScoreDelta) -> BoxFuture<'static, StorageResult<ScoreTotals>>;
    /// Insert the answer event and apply the delta as one unit. Returns `None` without any
    /// change when the same user already answered the same question for the same game.
    fn record_answer(
        &self,
        answer: AnswerEventEntity,
        delta: ScoreDelta,
    ) -> BoxFuture<'static, StorageResult<Option<ScoreTotals>>>;

    /// Persist a game session. Fails with a conflict when the code is already taken.
    fn create_game_session(
        &self,
        session: NewGameSessionEntity,
    ) -> BoxFuture<'static, StorageResult<GameSessionEntity>>;
    fn find_game_session(
        &self,
        id: u64,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>>;
    fn find_game_session_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>>;
    fn game_code_exists(&self, code: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Register `user_id` as a participant of `game_id`; joining twice is a no-op.
    fn add_participant(&self, game_id: u64, user_id: u64)
    -> BoxFuture<'static, StorageResult<()>>;
    fn list_participants(&self, game_id: u64) -> BoxFuture<'static, StorageResult<Vec<u64>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database, IndexModel,
    bson::{DateTime, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        MongoAnswerDocument, MongoCounterDocument, MongoGameScoreDocument,
        MongoGameSessionDocument, MongoParticipantDocument, MongoPerformanceDocument,
        MongoQuestionDocument, MongoUserDocument, aggregate_update, from_bson_int, to_bson_int,
    },
};
use crate::dao::{
    models::{
        AnswerEventEntity, GameScoreEntity, GameSessionEntity, NewGameSessionEntity,
        NewQuestionEntity, NewUserEntity, PerformanceEntity, QuestionEntity, ScoreDelta,
        ScoreTotals, UserEntity,
    },
    quiz_store::QuizStore,
    storage::StorageResult,
};

const COUNTERS: &str = "counters";
const QUESTIONS: &str = "questions";
const USERS: &str = "users";
const PERFORMANCE: &str = "performance";
const GAME_SCORES: &str = "game_scores";
const ANSWERS: &str = "answers";
const GAME_SESSIONS: &str = "game_sessions";
const PARTICIPANTS: &str = "game_participants";

/// MongoDB-backed [`QuizStore`].
///
/// Multi-document writes run inside transactions, which requires a replica set deployment.
#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoQuizStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        let unique_indexes = [
            (USERS, "uid", doc! { "uid": 1 }),
            (GAME_SCORES, "user_id,game_name", doc! { "user_id": 1, "game_name": 1 }),
            (
                ANSWERS,
                "user_id,question_id,game_id",
                doc! { "user_id": 1, "question_id": 1, "game_id": 1 },
            ),
            (GAME_SESSIONS, "code", doc! { "code": 1 }),
            (PARTICIPANTS, "game_id,user_id", doc! { "game_id": 1, "user_id": 1 }),
        ];

        for (collection, index, keys) in unique_indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("{collection}_{}_idx", index.replace(',', "_"))))
                        .unique(Some(true))
                        .build(),
                )
                .build();

            database
                .collection::<mongodb::bson::Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database().await.collection::<T>(name)
    }

    async fn next_sequence(&self, name: &str) -> MongoResult<u64> {
        let counters = self.collection::<MongoCounterDocument>(COUNTERS).await;
        let counter = counters
            .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "next sequence",
                source,
            })?
            .ok_or(MongoDaoError::MissingDocument {
                operation: "next sequence",
            })?;
        Ok(from_bson_int(counter.seq))
    }

    async fn list_questions(&self) -> MongoResult<Vec<QuestionEntity>> {
        let collection = self.collection::<MongoQuestionDocument>(QUESTIONS).await;
        let documents: Vec<MongoQuestionDocument> = collection
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list questions",
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list questions",
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_question(&self, id: u64) -> MongoResult<Option<QuestionEntity>> {
        let collection = self.collection::<MongoQuestionDocument>(QUESTIONS).await;
        let document = collection
            .find_one(doc! { "_id": to_bson_int(id) })
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "find question",
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn insert_questions(
        &self,
        questions: Vec<NewQuestionEntity>,
    ) -> MongoResult<Vec<QuestionEntity>> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let mut entities = Vec::with_capacity(questions.len());
        for question in questions {
            let id = self.next_sequence(QUESTIONS).await?;
            entities.push(question.with_id(id));
        }

        let documents: Vec<MongoQuestionDocument> =
            entities.iter().cloned().map(Into::into).collect();
        self.collection::<MongoQuestionDocument>(QUESTIONS)
            .await
            .insert_many(documents)
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "insert questions",
                source,
            })?;
        Ok(entities)
    }

    async fn upsert_user(&self, user: NewUserEntity) -> MongoResult<UserEntity> {
        let candidate_id = to_bson_int(self.next_sequence(USERS).await?);
        let users = self.collection::<MongoUserDocument>(USERS).await;
        let document = users
            .find_one_and_update(
                doc! { "uid": &user.uid },
                doc! {
                    "$set": { "email": user.email, "display_name": user.display_name },
                    "$setOnInsert": { "_id": candidate_id },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::from_write("upsert user", "user", source))?
            .ok_or(MongoDaoError::MissingDocument {
                operation: "upsert user",
            })?;

        self.collection::<MongoPerformanceDocument>(PERFORMANCE)
            .await
            .update_one(
                doc! { "_id": document.id },
                doc! {
                    "$setOnInsert": {
                        "score": 0_i64,
                        "attempts": 0_i64,
                        "correct": 0_i64,
                        "accuracy": 0.0,
                    }
                },
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "create performance row",
                source,
            })?;

        Ok(document.into())
    }

    async fn find_user(&self, filter: mongodb::bson::Document) -> MongoResult<Option<UserEntity>> {
        let users = self.collection::<MongoUserDocument>(USERS).await;
        let document = users
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "find user",
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_users(&self) -> MongoResult<Vec<UserEntity>> {
        let users = self.collection::<MongoUserDocument>(USERS).await;
        let documents: Vec<MongoUserDocument> = users
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list users",
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list users",
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn list_performance(&self) -> MongoResult<Vec<PerformanceEntity>> {
        let collection = self
            .collection::<MongoPerformanceDocument>(PERFORMANCE)
            .await;
        let documents: Vec<MongoPerformanceDocument> = collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list performance",
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list performance",
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn list_game_scores(&self, game_name: String) -> MongoResult<Vec<GameScoreEntity>> {
        let collection = self.collection::<MongoGameScoreDocument>(GAME_SCORES).await;
        let documents: Vec<MongoGameScoreDocument> = collection
            .find(doc! { "game_name": game_name })
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list game scores",
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list game scores",
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn start_transaction(&self) -> MongoResult<ClientSession> {
        let client = self.client().await;
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                step: "start session",
                source,
            })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                step: "start transaction",
                source,
            })?;
        Ok(session)
    }

    async fn finish_transaction<T>(
        mut session: ClientSession,
        outcome: MongoResult<T>,
    ) -> MongoResult<T> {
        match outcome {
            Ok(value) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|source| MongoDaoError::Transaction {
                        step: "commit",
                        source,
                    })?;
                Ok(value)
            }
            Err(err) => {
                let _ = session.abort_transaction().await;
                Err(err)
            }
        }
    }

    /// Apply `delta` to every affected aggregate using the caller's transaction.
    async fn apply_in_session(
        &self,
        session: &mut ClientSession,
        delta: &ScoreDelta,
        at: DateTime,
    ) -> MongoResult<ScoreTotals> {
        let user_id = to_bson_int(delta.user_id);
        let performance = self
            .collection::<MongoPerformanceDocument>(PERFORMANCE)
            .await
            .find_one_and_update(
                doc! { "_id": user_id },
                aggregate_update(delta.points, delta.correct, at),
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "update performance",
                source,
            })?
            .ok_or(MongoDaoError::MissingDocument {
                operation: "update performance",
            })?;

        let game = match &delta.game {
            Some(game) => {
                self.collection::<MongoParticipantDocument>(PARTICIPANTS)
                    .await
                    .update_one(
                        doc! { "game_id": to_bson_int(game.id), "user_id": user_id },
                        doc! { "$setOnInsert": { "joined_at": at } },
                    )
                    .upsert(true)
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::Operation {
                        operation: "register participant",
                        source,
                    })?;

                let score = self
                    .collection::<MongoGameScoreDocument>(GAME_SCORES)
                    .await
                    .find_one_and_update(
                        doc! { "user_id": user_id, "game_name": &game.name },
                        aggregate_update(delta.points, delta.correct, at),
                    )
                    .upsert(true)
                    .return_document(ReturnDocument::After)
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::Operation {
                        operation: "update game score",
                        source,
                    })?
                    .ok_or(MongoDaoError::MissingDocument {
                        operation: "update game score",
                    })?;
                Some(score.into())
            }
            None => None,
        };

        Ok(ScoreTotals {
            performance: performance.into(),
            game,
        })
    }

    async fn apply_score(&self, delta: ScoreDelta) -> MongoResult<ScoreTotals> {
        let mut session = self.start_transaction().await?;
        let outcome = self
            .apply_in_session(&mut session, &delta, DateTime::now())
            .await;
        Self::finish_transaction(session, outcome).await
    }

    async fn record_answer(
        &self,
        answer: AnswerEventEntity,
        delta: ScoreDelta,
    ) -> MongoResult<Option<ScoreTotals>> {
        let answered_at = DateTime::from_system_time(answer.answered_at);
        let document: MongoAnswerDocument = answer.into();
        let mut session = self.start_transaction().await?;

        let inserted = self
            .collection::<MongoAnswerDocument>(ANSWERS)
            .await
            .insert_one(&document)
            .session(&mut session)
            .await;

        let outcome = match inserted {
            Ok(_) => self
                .apply_in_session(&mut session, &delta, answered_at)
                .await
                .map(Some),
            Err(err) if is_duplicate_key(&err) => Ok(None),
            Err(source) => Err(MongoDaoError::Operation {
                operation: "insert answer",
                source,
            }),
        };

        match outcome {
            Ok(None) => {
                let _ = session.abort_transaction().await;
                Ok(None)
            }
            other => Self::finish_transaction(session, other).await,
        }
    }

    async fn create_game_session(
        &self,
        session: NewGameSessionEntity,
    ) -> MongoResult<GameSessionEntity> {
        let entity = GameSessionEntity {
            id: self.next_sequence(GAME_SESSIONS).await?,
            name: session.name,
            teacher_id: session.teacher_id,
            code: session.code,
            created_at: SystemTime::now(),
        };
        let document: MongoGameSessionDocument = entity.clone().into();
        self.collection::<MongoGameSessionDocument>(GAME_SESSIONS)
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                MongoDaoError::from_write("create game session", "game code", source)
            })?;
        Ok(entity)
    }

    async fn find_game_session(
        &self,
        filter: mongodb::bson::Document,
    ) -> MongoResult<Option<GameSessionEntity>> {
        let document = self
            .collection::<MongoGameSessionDocument>(GAME_SESSIONS)
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "find game session",
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn add_participant(&self, game_id: u64, user_id: u64) -> MongoResult<()> {
        self.collection::<MongoParticipantDocument>(PARTICIPANTS)
            .await
            .update_one(
                doc! { "game_id": to_bson_int(game_id), "user_id": to_bson_int(user_id) },
                doc! { "$setOnInsert": { "joined_at": DateTime::now() } },
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "add participant",
                source,
            })?;
        Ok(())
    }

    async fn list_participants(&self, game_id: u64) -> MongoResult<Vec<u64>> {
        let documents: Vec<MongoParticipantDocument> = self
            .collection::<MongoParticipantDocument>(PARTICIPANTS)
            .await
            .find(doc! { "game_id": to_bson_int(game_id) })
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list participants",
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Operation {
                operation: "list participants",
                source,
            })?;
        Ok(documents
            .into_iter()
            .map(|participant| from_bson_int(participant.user_id))
            .collect())
    }
}

impl QuizStore for MongoQuizStore {
    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_questions().await.map_err(Into::into) })
    }

    fn find_question(&self, id: u64) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_question(id).await.map_err(Into::into) })
    }

    fn insert_questions(
        &self,
        questions: Vec<NewQuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.insert_questions(questions).await.map_err(Into::into) })
    }

    fn upsert_user(&self, user: NewUserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: u64) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_user(doc! { "_id": to_bson_int(id) })
                .await
                .map_err(Into::into)
        })
    }

    fn find_user_by_uid(
        &self,
        uid: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_user(doc! { "uid": uid })
                .await
                .map_err(Into::into)
        })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_users().await.map_err(Into::into) })
    }

    fn list_performance(&self) -> BoxFuture<'static, StorageResult<Vec<PerformanceEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_performance().await.map_err(Into::into) })
    }

    fn list_game_scores(
        &self,
        game_name: String,
    ) -> BoxFuture<'static, StorageResult<Vec<GameScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_game_scores(game_name).await.map_err(Into::into) })
    }

    fn apply_score(&self, delta: ScoreDelta) -> BoxFuture<'static, StorageResult<ScoreTotals>> {
        let store = self.clone();
        Box::pin(async move { store.apply_score(delta).await.map_err(Into::into) })
    }

    fn record_answer(
        &self,
        answer: AnswerEventEntity,
        delta: ScoreDelta,
    ) -> BoxFuture<'static, StorageResult<Option<ScoreTotals>>> {
        let store = self.clone();
        Box::pin(async move { store.record_answer(answer, delta).await.map_err(Into::into) })
    }

    fn create_game_session(
        &self,
        session: NewGameSessionEntity,
    ) -> BoxFuture<'static, StorageResult<GameSessionEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_game_session(session).await.map_err(Into::into) })
    }

    fn find_game_session(
        &self,
        id: u64,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_game_session(doc! { "_id": to_bson_int(id) })
                .await
                .map_err(Into::into)
        })
    }

    fn find_game_session_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_game_session(doc! { "code": code })
                .await
                .map_err(Into::into)
        })
    }

    fn game_code_exists(&self, code: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_game_session(doc! { "code": code })
                .await
                .map(|found| found.is_some())
                .map_err(Into::into)
        })
    }

    fn add_participant(
        &self,
        game_id: u64,
        user_id: u64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .add_participant(game_id, user_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_participants(&self, game_id: u64) -> BoxFuture<'static, StorageResult<Vec<u64>>> {
        let store = self.clone();
        Box::pin(async move { store.list_participants(game_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

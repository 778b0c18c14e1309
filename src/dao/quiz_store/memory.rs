//! Process-local [`QuizStore`] used when no database is configured and by the test suites.
//!
//! All tables live behind a single mutex so every trait method is trivially atomic.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use super::QuizStore;
use crate::dao::{
    models::{
        AnswerEventEntity, GameScoreEntity, GameSessionEntity, NewGameSessionEntity,
        NewQuestionEntity, NewUserEntity, PerformanceEntity, QuestionEntity, ScoreAggregate,
        ScoreDelta, ScoreTotals, UserEntity,
    },
    storage::{StorageError, StorageResult},
};

/// In-memory [`QuizStore`] implementation.
#[derive(Clone, Default)]
pub struct InMemoryQuizStore {
    tables: Arc<Mutex<Tables>>,
    offline: Arc<AtomicBool>,
}

#[derive(Default)]
struct Tables {
    last_question_id: u64,
    questions: BTreeMap<u64, QuestionEntity>,
    last_user_id: u64,
    users: BTreeMap<u64, UserEntity>,
    performance: HashMap<u64, PerformanceEntity>,
    game_scores: HashMap<(u64, String), GameScoreEntity>,
    answers: Vec<AnswerEventEntity>,
    answer_keys: HashSet<(u64, u64, Option<u64>)>,
    last_game_id: u64,
    games: BTreeMap<u64, GameSessionEntity>,
    participants: HashMap<u64, BTreeSet<u64>>,
}

impl InMemoryQuizStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of answer events recorded so far.
    pub async fn answer_count(&self) -> usize {
        self.tables.lock().await.answers.len()
    }

    /// Simulate an outage: score writes and health checks fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "in-memory store is offline".into(),
                io::Error::new(io::ErrorKind::NotConnected, "store offline"),
            ));
        }
        Ok(())
    }
}

impl Tables {
    fn apply(&mut self, delta: &ScoreDelta, at: SystemTime) -> ScoreTotals {
        let performance = self
            .performance
            .entry(delta.user_id)
            .or_insert_with(|| PerformanceEntity {
                user_id: delta.user_id,
                totals: ScoreAggregate::default(),
            });
        performance.totals.record(delta.points, delta.correct, at);
        let performance = performance.clone();

        let game = delta.game.as_ref().map(|game| {
            self.participants
                .entry(game.id)
                .or_default()
                .insert(delta.user_id);
            let score = self
                .game_scores
                .entry((delta.user_id, game.name.clone()))
                .or_insert_with(|| GameScoreEntity {
                    user_id: delta.user_id,
                    game_name: game.name.clone(),
                    totals: ScoreAggregate::default(),
                });
            score.totals.record(delta.points, delta.correct, at);
            score.clone()
        });

        ScoreTotals { performance, game }
    }
}

impl QuizStore for InMemoryQuizStore {
    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.questions.values().cloned().collect())
        })
    }

    fn find_question(&self, id: u64) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.lock().await.questions.get(&id).cloned()) })
    }

    fn insert_questions(
        &self,
        questions: Vec<NewQuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            let mut inserted = Vec::with_capacity(questions.len());
            for question in questions {
                tables.last_question_id += 1;
                let entity = question.with_id(tables.last_question_id);
                tables.questions.insert(entity.id, entity.clone());
                inserted.push(entity);
            }
            Ok(inserted)
        })
    }

    fn upsert_user(&self, user: NewUserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            let existing = tables
                .users
                .values()
                .find(|candidate| candidate.uid == user.uid)
                .map(|candidate| candidate.id);

            let id = match existing {
                Some(id) => id,
                None => {
                    tables.last_user_id += 1;
                    tables.last_user_id
                }
            };

            let entity = UserEntity {
                id,
                uid: user.uid,
                email: user.email,
                display_name: user.display_name,
            };
            tables.users.insert(id, entity.clone());
            tables
                .performance
                .entry(id)
                .or_insert_with(|| PerformanceEntity {
                    user_id: id,
                    totals: ScoreAggregate::default(),
                });
            Ok(entity)
        })
    }

    fn find_user(&self, id: u64) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.lock().await.users.get(&id).cloned()) })
    }

    fn find_user_by_uid(
        &self,
        uid: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.users.values().find(|user| user.uid == uid).cloned())
        })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.lock().await.users.values().cloned().collect()) })
    }

    fn list_performance(&self) -> BoxFuture<'static, StorageResult<Vec<PerformanceEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.performance.values().cloned().collect())
        })
    }

    fn list_game_scores(
        &self,
        game_name: String,
    ) -> BoxFuture<'static, StorageResult<Vec<GameScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables
                .game_scores
                .values()
                .filter(|score| score.game_name == game_name)
                .cloned()
                .collect())
        })
    }

    fn apply_score(&self, delta: ScoreDelta) -> BoxFuture<'static, StorageResult<ScoreTotals>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let mut tables = store.tables.lock().await;
            Ok(tables.apply(&delta, SystemTime::now()))
        })
    }

    fn record_answer(
        &self,
        answer: AnswerEventEntity,
        delta: ScoreDelta,
    ) -> BoxFuture<'static, StorageResult<Option<ScoreTotals>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let mut tables = store.tables.lock().await;
            let key = (
                answer.user_id,
                answer.question_id,
                answer.game.as_ref().map(|game| game.id),
            );
            if !tables.answer_keys.insert(key) {
                return Ok(None);
            }
            let totals = tables.apply(&delta, answer.answered_at);
            tables.answers.push(answer);
            Ok(Some(totals))
        })
    }

    fn create_game_session(
        &self,
        session: NewGameSessionEntity,
    ) -> BoxFuture<'static, StorageResult<GameSessionEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            if tables.games.values().any(|game| game.code == session.code) {
                return Err(StorageError::conflict(format!(
                    "game code `{}` already in use",
                    session.code
                )));
            }
            tables.last_game_id += 1;
            let entity = GameSessionEntity {
                id: tables.last_game_id,
                name: session.name,
                teacher_id: session.teacher_id,
                code: session.code,
                created_at: SystemTime::now(),
            };
            tables.games.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn find_game_session(
        &self,
        id: u64,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.lock().await.games.get(&id).cloned()) })
    }

    fn find_game_session_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.games.values().find(|game| game.code == code).cloned())
        })
    }

    fn game_code_exists(&self, code: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.games.values().any(|game| game.code == code))
        })
    }

    fn add_participant(
        &self,
        game_id: u64,
        user_id: u64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            tables.participants.entry(game_id).or_default().insert(user_id);
            Ok(())
        })
    }

    fn list_participants(&self, game_id: u64) -> BoxFuture<'static, StorageResult<Vec<u64>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables
                .participants
                .get(&game_id)
                .map(|members| members.iter().copied().collect())
                .unwrap_or_default())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::GameRef;

    fn question(text: &str) -> NewQuestionEntity {
        NewQuestionEntity {
            text: text.into(),
            option_a: "1".into(),
            option_b: "2".into(),
            option_c: "3".into(),
            option_d: "4".into(),
            correct: "2".into(),
            difficulty: "Medium".into(),
        }
    }

    fn user(uid: &str) -> NewUserEntity {
        NewUserEntity {
            uid: uid.into(),
            email: Some(format!("{uid}@school.test")),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn questions_keep_insertion_order() {
        let store = InMemoryQuizStore::new();
        store
            .insert_questions(vec![question("first"), question("second")])
            .await
            .unwrap();
        store.insert_questions(vec![question("third")]).await.unwrap();

        let texts: Vec<_> = store
            .list_questions()
            .await
            .unwrap()
            .into_iter()
            .map(|q| (q.id, q.text))
            .collect();
        assert_eq!(
            texts,
            vec![
                (1, "first".to_string()),
                (2, "second".to_string()),
                (3, "third".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn upsert_user_is_keyed_by_uid_and_creates_performance_row() {
        let store = InMemoryQuizStore::new();
        let first = store.upsert_user(user("abc")).await.unwrap();
        let mut renamed = user("abc");
        renamed.display_name = Some("Ada".into());
        let second = store.upsert_user(renamed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name.as_deref(), Some("Ada"));
        let performance = store.list_performance().await.unwrap();
        assert_eq!(performance.len(), 1);
        assert_eq!(performance[0].totals.attempts, 0);
    }

    #[tokio::test]
    async fn apply_score_updates_both_aggregates_and_participation() {
        let store = InMemoryQuizStore::new();
        let ada = store.upsert_user(user("ada")).await.unwrap();
        let game = GameRef {
            id: 7,
            name: "Friday quiz".into(),
        };

        store
            .apply_score(ScoreDelta {
                user_id: ada.id,
                points: 15,
                correct: true,
                game: Some(game.clone()),
            })
            .await
            .unwrap();
        let totals = store
            .apply_score(ScoreDelta {
                user_id: ada.id,
                points: 0,
                correct: false,
                game: Some(game),
            })
            .await
            .unwrap();

        assert_eq!(totals.performance.totals.score, 15);
        assert_eq!(totals.performance.totals.attempts, 2);
        assert_eq!(totals.performance.totals.accuracy, 50.0);
        let game_totals = totals.game.unwrap();
        assert_eq!(game_totals.totals.score, 15);
        assert_eq!(store.list_participants(7).await.unwrap(), vec![ada.id]);
    }

    #[tokio::test]
    async fn record_answer_rejects_duplicates_without_changes() {
        let store = InMemoryQuizStore::new();
        let ada = store.upsert_user(user("ada")).await.unwrap();
        let answer = AnswerEventEntity {
            user_id: ada.id,
            question_id: 1,
            game: None,
            selected: "2".into(),
            correct_answer: "2".into(),
            is_correct: true,
            answered_at: SystemTime::now(),
        };
        let delta = ScoreDelta {
            user_id: ada.id,
            points: 10,
            correct: true,
            game: None,
        };

        let first = store
            .record_answer(answer.clone(), delta.clone())
            .await
            .unwrap();
        let second = store.record_answer(answer, delta).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.answer_count().await, 1);
        let performance = store.list_performance().await.unwrap();
        assert_eq!(performance[0].totals.score, 10);
    }

    #[tokio::test]
    async fn duplicate_game_codes_conflict() {
        let store = InMemoryQuizStore::new();
        let session = NewGameSessionEntity {
            name: "Quiz".into(),
            teacher_id: 1,
            code: "ABC123".into(),
        };
        store.create_game_session(session.clone()).await.unwrap();
        let err = store.create_game_session(session).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
        assert!(store.game_code_exists("ABC123".into()).await.unwrap());
    }
}

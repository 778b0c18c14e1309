//! Background task driving the shared question sequence.
//!
//! The task loads the catalog, waits the start delay, then alternates between opening a
//! question and closing its window on a fixed period until the catalog is exhausted. It is
//! stopped only by the application shutdown signal.

use std::time::Duration;

use tokio::{sync::watch, time::sleep};
use tracing::{info, warn};

use crate::{
    services::{catalog_service, sse_events},
    state::{
        SharedState,
        session::{Advance, SessionError},
    },
};

const CATALOG_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Run the sequence to completion or until shutdown is requested.
pub async fn run(state: SharedState) {
    let mut shutdown = state.shutdown_watcher();
    let config = state.config();

    loop {
        match catalog_service::reload_catalog(&state).await {
            Ok(questions) => {
                info!(questions, "catalog ready; waiting for the start delay");
                break;
            }
            Err(err) => {
                warn!(error = %err, "catalog not loaded yet; retrying");
                if !pause(&mut shutdown, CATALOG_RETRY_DELAY).await {
                    return;
                }
            }
        }
    }

    if !pause(&mut shutdown, config.start_delay).await {
        return;
    }

    loop {
        match advance(&state).await {
            Ok(Advance::Live(_)) => {}
            Ok(Advance::GameOver { total_questions }) => {
                info!(total_questions, "question sequence finished");
                return;
            }
            Err(err) => {
                warn!(error = %err, "sequencer advance refused; stopping");
                return;
            }
        }

        if !pause(&mut shutdown, config.question_window).await {
            return;
        }

        if let Err(err) = close_window(&state).await {
            warn!(error = %err, "failed to close the answer window");
        }
    }
}

/// Move to the next question and announce it.
pub async fn advance(state: &SharedState) -> Result<Advance, SessionError> {
    let advance = state.session().lock().await.advance()?;
    match &advance {
        Advance::Live(live) => {
            info!(
                question_id = live.question.id,
                number = live.index + 1,
                total = live.total,
                "question is live"
            );
            sse_events::broadcast_new_question(state, live);
        }
        Advance::GameOver { total_questions } => {
            sse_events::broadcast_game_over(state, *total_questions);
        }
    }
    Ok(advance)
}

/// Stop accepting answers for the live question.
pub async fn close_window(state: &SharedState) -> Result<usize, SessionError> {
    let index = state.session().lock().await.close_window()?;
    info!(number = index + 1, "answer window closed");
    Ok(index)
}

/// Sleep for `duration` unless shutdown is requested first. Returns `false` on shutdown.
async fn pause(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    if *shutdown.borrow_and_update() {
        return false;
    }
    tokio::select! {
        _ = sleep(duration) => true,
        _ = shutdown.changed() => {
            info!("sequencer stopping on shutdown");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::NewQuestionEntity,
            quiz_store::{QuizStore, memory::InMemoryQuizStore},
        },
        dto::sse::ServerEvent,
        state::{AppState, session::SessionPhase},
    };

    async fn seeded_state(questions: usize) -> SharedState {
        let config = AppConfig {
            question_window: Duration::from_secs(30),
            start_delay: Duration::from_secs(15),
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        let store = InMemoryQuizStore::new();
        let rows = (1..=questions)
            .map(|i| NewQuestionEntity {
                text: format!("Question {i}"),
                option_a: "a".into(),
                option_b: "b".into(),
                option_c: "c".into(),
                option_d: "d".into(),
                correct: "a".into(),
                difficulty: "Easy".into(),
            })
            .collect();
        store.insert_questions(rows).await.unwrap();
        state.install_quiz_store(Arc::new(store)).await;
        state
    }

    fn drain(receiver: &mut broadcast::Receiver<ServerEvent>) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            names.push(event.event);
        }
        names
    }

    #[tokio::test(start_paused = true)]
    async fn runs_the_catalog_to_game_over_on_schedule() {
        let state = seeded_state(2).await;
        let mut events = state.public_sse().subscribe();
        let task = tokio::spawn(run(state.clone()));

        sleep(Duration::from_millis(14_900)).await;
        assert_eq!(state.session().lock().await.phase(), SessionPhase::Idle);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(
            state.session().lock().await.phase(),
            SessionPhase::QuestionLive(0)
        );
        assert_eq!(drain(&mut events), vec!["new-question"]);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(
            state.session().lock().await.phase(),
            SessionPhase::QuestionLive(1)
        );

        sleep(Duration::from_secs(30)).await;
        assert_eq!(state.session().lock().await.phase(), SessionPhase::GameOver);
        assert_eq!(drain(&mut events), vec!["new-question", "game-over"]);

        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_storage_before_loading_the_catalog() {
        let state = AppState::new(AppConfig::default());
        let task = tokio::spawn(run(state.clone()));

        sleep(Duration::from_secs(5)).await;
        assert_eq!(state.session().lock().await.catalog().len(), 0);

        let store = InMemoryQuizStore::new();
        store
            .insert_questions(vec![NewQuestionEntity {
                text: "Only question".into(),
                option_a: "a".into(),
                option_b: "b".into(),
                option_c: "c".into(),
                option_d: "d".into(),
                correct: "a".into(),
                difficulty: "Easy".into(),
            }])
            .await
            .unwrap();
        state.install_quiz_store(Arc::new(store)).await;

        sleep(Duration::from_secs(2)).await;
        assert_eq!(state.session().lock().await.catalog().len(), 1);

        state.request_shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_the_pending_window() {
        let state = seeded_state(3).await;
        let task = tokio::spawn(run(state.clone()));

        sleep(Duration::from_secs(20)).await;
        assert_eq!(
            state.session().lock().await.phase(),
            SessionPhase::QuestionLive(0)
        );

        state.request_shutdown();
        task.await.unwrap();
        assert_eq!(
            state.session().lock().await.phase(),
            SessionPhase::QuestionLive(0)
        );
    }
}

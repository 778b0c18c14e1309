use std::{future::Future, sync::Arc, time::Duration};

use tokio::{sync::watch, time::sleep};
use tracing::{info, warn};

use crate::{
    dao::{quiz_store::QuizStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Reconnect to the storage backend and keep the shared state in degraded mode when it is
/// unavailable. Returns once shutdown is requested.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn QuizStore>, StorageError>> + Send,
{
    let mut shutdown = state.shutdown_watcher();
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_quiz_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                if !watch_health(&state, &store, &mut shutdown).await {
                    return;
                }

                state.clear_quiz_store().await;
                if !pause(&mut shutdown, delay).await {
                    return;
                }
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                if !pause(&mut shutdown, delay).await {
                    return;
                }
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll the store until reconnection attempts are exhausted (`true`) or shutdown (`false`).
async fn watch_health(
    state: &SharedState,
    store: &Arc<dyn QuizStore>,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                }
                if !pause(shutdown, HEALTH_POLL_INTERVAL).await {
                    return false;
                }
            }
            Err(_) => {
                let mut attempt = 0;
                let mut reconnect_delay = INITIAL_DELAY;
                let mut reconnected = false;

                while attempt < MAX_RECONNECT_ATTEMPTS {
                    match store.try_reconnect().await {
                        Ok(()) => {
                            info!("storage reconnection succeeded after health check failure");
                            reconnected = true;
                            break;
                        }
                        Err(reconnect_err) => {
                            if attempt == 0 {
                                warn!(
                                    attempt, error = %reconnect_err,
                                    "storage reconnect first attempt failed; entering degraded mode"
                                );
                                state.update_degraded(true).await;
                            } else {
                                warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                            }
                            attempt += 1;
                            if !pause(shutdown, reconnect_delay).await {
                                return false;
                            }
                            reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                        }
                    }
                }

                if reconnected {
                    state.update_degraded(false).await;
                    if !pause(shutdown, HEALTH_POLL_INTERVAL).await {
                        return false;
                    }
                } else {
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    return true;
                }
            }
        }
    }
}

async fn pause(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    if *shutdown.borrow_and_update() {
        return false;
    }
    tokio::select! {
        _ = sleep(duration) => true,
        _ = shutdown.changed() => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::{config::AppConfig, dao::quiz_store::memory::InMemoryQuizStore, state::AppState};

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_backend_connects() {
        let state = AppState::new(AppConfig::default());
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let task = tokio::spawn(run(state.clone(), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StorageError::unavailable(
                        "not yet".into(),
                        std::io::Error::other("refused"),
                    ))
                } else {
                    Ok(Arc::new(InMemoryQuizStore::new()) as Arc<dyn QuizStore>)
                }
            }
        }));

        assert!(state.is_degraded().await);
        sleep(Duration::from_secs(4)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(!state.is_degraded().await);
        assert!(state.quiz_store().await.is_some());

        state.request_shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_health_checks_enter_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        let store = InMemoryQuizStore::new();
        let handle = store.clone();

        let task = tokio::spawn(run(state.clone(), move || {
            let store = store.clone();
            async move { Ok(Arc::new(store) as Arc<dyn QuizStore>) }
        }));

        sleep(Duration::from_secs(1)).await;
        assert!(!state.is_degraded().await);

        handle.set_offline(true);
        sleep(Duration::from_secs(6)).await;
        assert!(state.is_degraded().await);

        handle.set_offline(false);
        sleep(Duration::from_secs(20)).await;
        assert!(!state.is_degraded().await);

        state.request_shutdown();
        task.await.unwrap();
    }
}

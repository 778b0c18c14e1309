pub mod catalog;
pub mod scoring;
pub mod session;
mod sse;

use std::{sync::Arc, time::Instant};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use uuid::Uuid;

use crate::{config::AppConfig, dao::quiz_store::QuizStore, error::ServiceError};

pub use self::session::QuizSession;
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

const PUBLIC_EVENT_CAPACITY: usize = 64;

#[derive(Clone)]
/// Handle used to push messages to a connected WebSocket client.
pub struct ClientConnection {
    pub tx: mpsc::UnboundedSender<Message>,
    pub connected_at: Instant,
}

impl ClientConnection {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            tx,
            connected_at: Instant::now(),
        }
    }
}

/// Central application state: storage handle, live session, broadcast hub and connections.
pub struct AppState {
    quiz_store: RwLock<Option<Arc<dyn QuizStore>>>,
    public_sse: SseHub,
    clients: DashMap<Uuid, ClientConnection>,
    session: Mutex<QuizSession>,
    config: Arc<AppConfig>,
    degraded: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let (shutdown_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            quiz_store: RwLock::new(None),
            public_sse: SseHub::new(PUBLIC_EVENT_CAPACITY),
            clients: DashMap::new(),
            session: Mutex::new(QuizSession::new()),
            config: Arc::new(config),
            degraded: degraded_tx,
            shutdown: shutdown_tx,
        })
    }

    /// Obtain a handle to the current quiz store, if one is installed.
    pub async fn quiz_store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.quiz_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the quiz store or fail with [`ServiceError::Degraded`].
    pub async fn require_quiz_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        self.quiz_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new quiz store implementation and leave degraded mode.
    pub async fn install_quiz_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.quiz_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current quiz store and enter degraded mode.
    pub async fn clear_quiz_store(&self) {
        {
            let mut guard = self.quiz_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Broadcast hub used for public events.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    /// Registry of connected WebSocket clients keyed by connection id.
    pub fn clients(&self) -> &DashMap<Uuid, ClientConnection> {
        &self.clients
    }

    /// Send a close frame to every registered client and return how many writers took it.
    ///
    /// Entries stay registered until their socket loop ends and removes them.
    pub fn close_clients(&self) -> usize {
        self.clients
            .iter()
            .filter(|client| client.tx.send(Message::Close(None)).is_ok())
            .count()
    }

    /// The live quiz session. Every read-modify-write must hold this lock.
    pub fn session(&self) -> &Mutex<QuizSession> {
        &self.session
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Subscribe to the process shutdown signal.
    pub fn shutdown_watcher(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Ask background tasks to stop.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_closes_registered_clients() {
        let state = AppState::new(AppConfig::default());
        let (open_tx, mut open_rx) = mpsc::unbounded_channel();
        let (gone_tx, gone_rx) = mpsc::unbounded_channel();
        drop(gone_rx);
        state
            .clients()
            .insert(Uuid::new_v4(), ClientConnection::new(open_tx));
        state
            .clients()
            .insert(Uuid::new_v4(), ClientConnection::new(gone_tx));

        assert_eq!(state.close_clients(), 1);
        assert!(matches!(open_rx.try_recv(), Ok(Message::Close(None))));
        assert!(open_rx.try_recv().is_err());
        assert_eq!(state.clients().len(), 2);
    }
}

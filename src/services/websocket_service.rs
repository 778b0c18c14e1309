use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc,
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{sse::ServerEvent, ws::ClientInboundMessage},
    services::{answer_service, sse_events},
    state::{ClientConnection, SharedState},
};

/// Handle the full lifecycle of one quiz client WebSocket connection.
///
/// Every hub event is forwarded to the socket; `submit-answer` messages are scored and
/// acknowledged to this socket only.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let client_id = Uuid::new_v4();
    state
        .clients()
        .insert(client_id, ClientConnection::new(outbound_tx.clone()));
    info!(%client_id, clients = state.clients().len(), "quiz client connected");

    let forward_task = spawn_forwarder(state.public_sse().subscribe(), outbound_tx.clone());

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientInboundMessage::from_json_str(&text) {
                Ok(ClientInboundMessage::SubmitAnswer(submission)) => {
                    let result = answer_service::submit_live_answer(&state, submission).await;
                    debug!(%client_id, outcome = ?result.outcome, "answer acknowledged");
                    if let Some(event) = sse_events::answer_result_event(&result) {
                        if send_event(&outbound_tx, &event).is_err() {
                            info!(%client_id, "connection closed while acknowledging answer");
                            break;
                        }
                    }
                }
                Ok(ClientInboundMessage::Unknown) => {
                    debug!(%client_id, payload = %text, "ignoring unknown client message");
                }
                Err(err) => {
                    warn!(%client_id, error = %err, "failed to parse client message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%client_id, "quiz client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%client_id, error = %err, "websocket error");
                break;
            }
        }
    }

    forward_task.abort();
    let connected_secs = state
        .clients()
        .remove(&client_id)
        .map(|(_, client)| client.connected_at.elapsed().as_secs())
        .unwrap_or_default();
    info!(
        %client_id,
        connected_secs,
        clients = state.clients().len(),
        "quiz client disconnected"
    );

    finalize(writer_task, outbound_tx).await;
}

/// Relay hub events to one socket until either side goes away.
fn spawn_forwarder(
    mut receiver: broadcast::Receiver<ServerEvent>,
    tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if send_event(&tx, &event).is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagged behind the event hub");
                }
            }
        }
    })
}

/// Serialize an event as `{ "event": ..., "data": ... }` and queue it on the writer.
///
/// Serialization failures are logged and swallowed; `Err` means the writer is gone.
fn send_event(tx: &mpsc::UnboundedSender<Message>, event: &ServerEvent) -> Result<(), ()> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(event = %event.event, error = %err, "failed to serialize websocket event");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload.into())).map_err(|_| ())
}

/// Close the writer channel and wait for the writer task to drain.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

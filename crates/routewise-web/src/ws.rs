//! WebSocket upgrade handler and progress forwarding.
//!
//! A client binds to a session with
//! `{"type":"join_session","session_id":"..."}` and from then on receives
//! every [`ProgressEvent`] published for that session as a JSON text frame.
//! Joining again moves the socket to the new session. Disconnecting unbinds.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use routewise::progress::{BindingId, ProgressBus, ProgressEvent};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::AppState;

/// Frames queued for one socket before forwarders wait.
const OUTBOUND_BUFFER: usize = 64;

#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    JoinSession { session_id: String },
    LeaveSession,
}

/// The session a socket is bound to and the task forwarding its events.
struct Binding {
    session_id: String,
    id: BindingId,
    forwarder: JoinHandle<()>,
}

/// GET /ws: WebSocket upgrade handler.
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(app): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(socket: WebSocket, app: AppState) {
    let (mut sink, mut stream) = socket.split();
    let bus = app.router.progress();

    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break; // Client disconnected.
            }
        }
    });

    debug!("WebSocket client connected");
    let mut binding: Option<Binding> = None;

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::JoinSession { session_id }) => {
                    release(bus, binding.take());
                    let (id, rx) = bus.bind(&session_id);
                    debug!("WebSocket client joined session {session_id}");
                    binding = Some(Binding {
                        session_id,
                        id,
                        forwarder: tokio::spawn(forward(rx, out_tx.clone())),
                    });
                }
                Ok(ClientMessage::LeaveSession) => release(bus, binding.take()),
                Err(_) => debug!("Ignoring malformed WebSocket message"),
            },
            Message::Close(_) => break,
            _ => {} // Ignore binary, ping, pong.
        }
    }

    release(bus, binding.take());
    writer.abort();
    debug!("WebSocket client disconnected");
}

/// Stop forwarding and unbind the session.
fn release(bus: &ProgressBus, binding: Option<Binding>) {
    let Some(binding) = binding else {
        return;
    };
    // A session rebound by another socket stays bound.
    bus.leave_binding(&binding.session_id, binding.id);
    binding.forwarder.abort();
}

async fn forward(mut rx: broadcast::Receiver<ProgressEvent>, out: mpsc::Sender<String>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let Ok(json) = serde_json::to_string(&event) else {
                    continue;
                };
                if out.send(json).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("WebSocket client lagged by {n} progress events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routewise::progress::ProgressStage;

    #[test]
    fn client_messages_deserialize() {
        let join: ClientMessage =
            serde_json::from_str(r#"{"type":"join_session","session_id":"s1"}"#).unwrap();
        assert_eq!(
            join,
            ClientMessage::JoinSession {
                session_id: "s1".into()
            }
        );
        let leave: ClientMessage = serde_json::from_str(r#"{"type":"leave_session"}"#).unwrap();
        assert_eq!(leave, ClientMessage::LeaveSession);
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"chat"}"#).is_err());
    }

    #[tokio::test]
    async fn forwards_events_as_json() {
        let bus = ProgressBus::default();
        let rx = bus.join("s1");
        let (tx, mut out) = mpsc::channel(8);
        let task = tokio::spawn(forward(rx, tx));

        bus.emit_writing("s1", None);
        let frame = out.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["stage"], ProgressStage::Writing.to_string());
        assert_eq!(json["session_id"], "s1");

        // Unbinding closes the channel and ends the forwarder.
        assert!(bus.leave("s1"));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn release_keeps_a_session_taken_over_by_another_socket() {
        let bus = ProgressBus::default();
        let (tx, _out) = mpsc::channel(8);
        let (id, rx) = bus.bind("s1");
        let first = Binding {
            session_id: "s1".into(),
            id,
            forwarder: tokio::spawn(forward(rx, tx.clone())),
        };

        // Another socket rebinds, and the first disconnects before its
        // forwarder has run.
        let mut second = bus.join("s1");
        release(&bus, Some(first));
        assert!(bus.is_bound("s1"));

        bus.emit_thinking("s1", None);
        assert_eq!(second.try_recv().unwrap().stage, Some(ProgressStage::Thinking));
    }

    #[tokio::test]
    async fn release_unbinds_own_session() {
        let bus = ProgressBus::default();
        let (tx, _out) = mpsc::channel(8);
        let (id, rx) = bus.bind("s1");
        let binding = Binding {
            session_id: "s1".into(),
            id,
            forwarder: tokio::spawn(forward(rx, tx)),
        };

        release(&bus, Some(binding));
        assert!(!bus.is_bound("s1"));
    }
}

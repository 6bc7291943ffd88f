//! The live channel: WebSocket sessions fed by the relay broadcast.
//!
//! Each accepted connection registers a session with the
//! [`SessionRegistry`](crate::registry::SessionRegistry) and forwards its
//! bounded queue to the socket. Sessions are receive-only; the only
//! inbound frames acted on are close frames. When the session's queue
//! closes (relay failure severed it) the socket is closed so the client
//! re-bootstraps.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info};

use crate::routes::AppState;

/// `GET /ws` — upgrade to a live subscriber session.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| session_loop(socket, state))
}

async fn session_loop(socket: WebSocket, state: AppState) {
    let (session_id, mut rx) = state.registry.register();
    info!(session_id, "live session connected");

    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(payload) => {
                    let text = String::from_utf8_lossy(&payload).into_owned();
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // Queue closed: this session was severed (relay failure
                // or eviction). Close the socket to force re-bootstrap.
                None => {
                    debug!(session_id, "session queue closed, dropping socket");
                    break;
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {} // receive-only channel; ignore inbound data
            },
        }
    }

    state.registry.unregister(session_id);
    info!(session_id, "live session disconnected");
}

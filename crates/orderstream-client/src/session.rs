//! A live session: one reconciler bound to a real server.
//!
//! Connection order matters and mirrors the bootstrap rule: the
//! WebSocket subscription is opened *first*, then the snapshot is
//! fetched. Events that arrive while the fetch is in flight queue on the
//! session channel and are buffered by the reconciler, so no change
//! committed between "subscribed" and "snapshot read" is lost.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use orderstream_core::{ChangeEvent, Order, ServerMessage};

use crate::error::ClientError;
use crate::reconciler::OrderReconciler;
use crate::snapshot::ApiClient;

/// Buffered events between the socket reader and the reconciler.
const SESSION_QUEUE: usize = 256;

/// A bootstrapped, synchronized session over one server.
///
/// Dropping the session closes the subscription and discards the local
/// list. After [`ClientError::FeedClosed`] the list stays readable but
/// no longer tracks the server; reconnect by constructing a new session.
pub struct LiveSession {
    reconciler: OrderReconciler,
    events: mpsc::Receiver<ChangeEvent>,
    read_task: JoinHandle<()>,
}

impl LiveSession {
    /// Opens the live subscription, fetches the snapshot, and returns a
    /// synchronized session.
    ///
    /// # Errors
    ///
    /// [`ClientError::Ws`] if the subscription cannot be established,
    /// [`ClientError::Transport`] if the snapshot fetch fails. Both are
    /// retryable by calling `connect` again.
    pub async fn connect(api: &ApiClient, ws_url: &str) -> Result<Self, ClientError> {
        // Subscribe before fetching so in-flight changes are buffered,
        // not dropped.
        let (ws, _response) = connect_async(ws_url).await?;
        let (_write, mut read) = ws.split();

        let (tx, mut events) = mpsc::channel(SESSION_QUEUE);
        let read_task = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_ref()) {
                            Ok(ServerMessage::OrderUpdate { event }) => {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "ignoring malformed live message");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "live channel read failed");
                        break;
                    }
                }
            }
            // tx drops here; the session observes the closed channel.
        });

        let mut reconciler = OrderReconciler::new();
        let snapshot = match api.list_all().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                read_task.abort();
                return Err(e);
            }
        };

        // Drain whatever arrived during the fetch into the bootstrap
        // buffer, then let the snapshot land.
        while let Ok(event) = events.try_recv() {
            reconciler.apply(event);
        }
        reconciler.complete_snapshot(snapshot);
        debug!(orders = reconciler.len(), "session synchronized");

        Ok(Self {
            reconciler,
            events,
            read_task,
        })
    }

    /// The current local list, newest-known-insert first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        self.reconciler.orders()
    }

    /// Number of orders known locally.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reconciler.len()
    }

    /// Whether the local list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reconciler.is_empty()
    }

    /// Awaits the next change event and applies it.
    ///
    /// # Errors
    ///
    /// [`ClientError::FeedClosed`] once the live channel is gone; the
    /// local list keeps its last-known-good contents.
    pub async fn next_change(&mut self) -> Result<(), ClientError> {
        match self.events.recv().await {
            Some(event) => {
                self.reconciler.apply(event);
                Ok(())
            }
            None => Err(ClientError::FeedClosed),
        }
    }

    /// Applies all currently queued events without waiting. Returns how
    /// many were applied.
    ///
    /// # Errors
    ///
    /// [`ClientError::FeedClosed`] once the live channel is gone and the
    /// queue is drained.
    pub fn drain_changes(&mut self) -> Result<usize, ClientError> {
        let mut applied = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.reconciler.apply(event);
                    applied += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => return Ok(applied),
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if applied > 0 {
                        return Ok(applied);
                    }
                    return Err(ClientError::FeedClosed);
                }
            }
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.read_task.abort();
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("orders", &self.len())
            .finish_non_exhaustive()
    }
}

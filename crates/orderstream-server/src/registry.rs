//! Session registry: bookkeeping of currently connected subscriber
//! sessions and the broadcast-to-all primitive.
//!
//! Each session gets its own bounded `tokio::sync::mpsc` channel so that
//! a slow session cannot block or affect other sessions. A session whose
//! buffer cannot accept a message is dropped and unregistered, not
//! retried.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::metrics::RelayMetrics;

/// Unique identifier for a connected subscriber session.
pub type SessionId = u64;

/// Default per-session send buffer, in messages.
pub const DEFAULT_SESSION_BUFFER: usize = 256;

struct SessionState {
    tx: tokio::sync::mpsc::Sender<Bytes>,
}

/// Outcome of one broadcast across the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Sessions that accepted the message.
    pub sent: usize,
    /// Sessions dropped because their buffer was full or closed.
    pub dropped: usize,
}

/// Tracks the set of live subscriber sessions.
///
/// Purely additive/removal bookkeeping; delivery order per session is
/// preserved by the per-session channel, and no cross-session ordering
/// is implied.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionState>>,
    buffer_capacity: usize,
    next_id: AtomicU64,
    metrics: Arc<RelayMetrics>,
}

impl SessionRegistry {
    /// Creates an empty registry with the given per-session buffer
    /// capacity.
    #[must_use]
    pub fn new(buffer_capacity: usize, metrics: Arc<RelayMetrics>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            buffer_capacity: buffer_capacity.max(1),
            next_id: AtomicU64::new(1),
            metrics,
        }
    }

    /// Registers a new session, returning its id and receive channel.
    pub fn register(&self) -> (SessionId, tokio::sync::mpsc::Receiver<Bytes>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = tokio::sync::mpsc::channel(self.buffer_capacity);
        self.sessions.write().insert(id, SessionState { tx });
        self.metrics.record_connect();
        debug!(session_id = id, "session registered");
        (id, rx)
    }

    /// Removes a session. Idempotent: unregistering an already-absent
    /// session is a no-op. Returns whether the session existed.
    pub fn unregister(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            self.metrics.record_disconnect();
            debug!(session_id = id, "session unregistered");
        }
        removed
    }

    /// Number of currently connected sessions (the observability count).
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Broadcasts a serialized payload to every registered session.
    ///
    /// Sessions that cannot accept the message (buffer full or receiver
    /// gone) are unregistered as part of the call.
    pub fn broadcast(&self, payload: &Bytes) -> BroadcastOutcome {
        let sessions = self.sessions.read();
        let mut sent = 0;
        let mut evicted: Vec<SessionId> = Vec::new();

        for (&id, state) in sessions.iter() {
            match state.tx.try_send(payload.clone()) {
                Ok(()) => sent += 1,
                Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                    warn!(session_id = id, "session buffer full, dropping session");
                    evicted.push(id);
                }
                Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                    evicted.push(id);
                }
            }
        }
        drop(sessions);

        // Evict outside the read lock.
        if !evicted.is_empty() {
            let mut sessions = self.sessions.write();
            for id in &evicted {
                if sessions.remove(id).is_some() {
                    self.metrics.record_disconnect();
                }
            }
        }

        self.metrics.record_broadcast(sent as u64, payload.len() as u64);
        for _ in 0..evicted.len() {
            self.metrics.record_drop();
        }

        BroadcastOutcome {
            sent,
            dropped: evicted.len(),
        }
    }

    /// Severs every session at once by dropping their send channels.
    ///
    /// Used by the relay's failure path: per-session forward loops see
    /// their channel close and shut the underlying connection, forcing
    /// clients to re-bootstrap.
    pub fn disconnect_all(&self) {
        let mut sessions = self.sessions.write();
        let count = sessions.len();
        sessions.clear();
        for _ in 0..count {
            self.metrics.record_disconnect();
        }
        if count > 0 {
            warn!(sessions = count, "all sessions severed");
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.session_count())
            .field("buffer_capacity", &self.buffer_capacity)
            .finish_non_exhaustive()
    }
}

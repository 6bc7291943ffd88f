//! Relay and registry counters, exposed via `GET /stats`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free atomic counters for the relay pipeline.
///
/// All counters use relaxed ordering; snapshot reads provide a
/// consistent-enough view for monitoring purposes.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Change events received from the store feed.
    pub events_relayed: AtomicU64,
    /// Per-session deliveries that succeeded.
    pub messages_sent: AtomicU64,
    /// Serialized bytes handed to the registry.
    pub bytes_broadcast: AtomicU64,
    /// Sessions dropped because their buffer was full or closed.
    pub sessions_dropped: AtomicU64,
    /// Currently connected sessions.
    pub connected_sessions: AtomicU64,
    /// Total session disconnections.
    pub session_disconnects: AtomicU64,
}

/// Point-in-time view of [`RelayMetrics`], serializable for `/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Change events received from the store feed.
    pub events_relayed: u64,
    /// Per-session deliveries that succeeded.
    pub messages_sent: u64,
    /// Serialized bytes handed to the registry.
    pub bytes_broadcast: u64,
    /// Sessions dropped because their buffer was full or closed.
    pub sessions_dropped: u64,
    /// Total session disconnections.
    pub session_disconnects: u64,
}

impl RelayMetrics {
    /// Creates a metrics instance with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one relayed event broadcast to `sent` sessions.
    pub fn record_broadcast(&self, sent: u64, bytes: u64) {
        self.events_relayed.fetch_add(1, Ordering::Relaxed);
        self.messages_sent.fetch_add(sent, Ordering::Relaxed);
        self.bytes_broadcast.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a session dropped for being slow or gone.
    pub fn record_drop(&self) {
        self.sessions_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a new session connection.
    pub fn record_connect(&self) {
        self.connected_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a session disconnection.
    pub fn record_disconnect(&self) {
        self.session_disconnects.fetch_add(1, Ordering::Relaxed);
        // Saturating subtract to avoid underflow on spurious disconnects.
        self.connected_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            })
            .ok();
    }

    /// Takes a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_relayed: self.events_relayed.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_broadcast: self.bytes_broadcast.load(Ordering::Relaxed),
            sessions_dropped: self.sessions_dropped.load(Ordering::Relaxed),
            session_disconnects: self.session_disconnects.load(Ordering::Relaxed),
        }
    }
}

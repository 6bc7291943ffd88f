//! Client error types.

/// Errors surfaced by the client pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Snapshot fetch or write request could not reach the server, or
    /// the server rejected it. Recoverable: an established session keeps
    /// its last-known-good local list; the caller retries the request.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// WebSocket-level failure while connecting or reading the live
    /// channel.
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    /// The live channel closed (server restart or relay failure). The
    /// session's list stays intact but receives no further events; the
    /// caller must re-bootstrap with a fresh session.
    #[error("live channel closed, re-bootstrap required")]
    FeedClosed,
}

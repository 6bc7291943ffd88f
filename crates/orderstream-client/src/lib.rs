//! # OrderStream Client
//!
//! Keeps a local ordered list of orders consistent with the server-side
//! truth, using a one-time snapshot plus a live stream of change events.
//!
//! The [`OrderReconciler`] is the pure state machine: it buffers events
//! while Bootstrapping, replaces its list wholesale when the snapshot
//! lands, and thereafter applies each event in arrival order. The
//! [`LiveSession`] wires a reconciler to a real server over a WebSocket
//! subscription (opened *before* the snapshot fetch, so no in-flight
//! change is lost) and the HTTP snapshot endpoint.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod reconciler;
pub mod session;
pub mod snapshot;

pub use error::ClientError;
pub use reconciler::OrderReconciler;
pub use session::LiveSession;
pub use snapshot::ApiClient;

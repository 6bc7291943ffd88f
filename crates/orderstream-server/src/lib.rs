//! # OrderStream Server
//!
//! Hosts the realtime synchronization pipeline: the [`ChangeRelay`]
//! bridges the store's change feed to the [`SessionRegistry`]'s
//! broadcast-to-all primitive, and an axum router serves the CRUD
//! endpoints plus the `/ws` live channel that sessions subscribe on.
//!
//! Feed failure is fatal: the feed carries no resume cursor, so the
//! relay severs every session (forcing clients to re-bootstrap) and
//! [`Server::serve`] returns an error for the hosting process to act on.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod relay;
pub mod routes;
pub mod server;
pub mod ws;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError};
pub use metrics::RelayMetrics;
pub use registry::{SessionId, SessionRegistry};
pub use relay::{ChangeRelay, RelayHandle, RelayState};
pub use server::Server;

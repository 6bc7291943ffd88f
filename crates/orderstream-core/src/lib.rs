//! # OrderStream Core
//!
//! Domain model and change source for the OrderStream realtime pipeline.
//!
//! The crate provides:
//!
//! - The [`Order`] record and its canonical identifier type [`OrderId`]
//! - The [`ChangeEvent`] emitted once per committed mutation, and the
//!   [`ServerMessage`] envelope it travels in on the live channel
//! - The [`OrderStore`] change source: an insertion-ordered collection
//!   whose mutations are observable as a live, ordered [`ChangeFeed`]
//!
//! Consumers subscribe to the feed *before* reading a snapshot and
//! reconcile the two; see the `orderstream-client` crate.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod event;
pub mod order;
pub mod protocol;
pub mod store;

pub use error::{FeedError, StoreError};
pub use event::{ChangeEvent, DocumentKey, Operation};
pub use order::{NewOrder, Order, OrderId, OrderPatch, OrderStatus};
pub use protocol::ServerMessage;
pub use store::{ChangeFeed, OrderStore, StoreConfig};

//! Error types for the store and its change feed.

/// Errors from store write operations.
///
/// A write targeting a nonexistent id is *not* an error: `update` and
/// `delete` report it as an affected count of zero.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write-path field failed validation before commit.
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Errors observed on a [`ChangeFeed`](crate::store::ChangeFeed).
///
/// Both variants are terminal for the subscription: the feed carries no
/// resume cursor, so events between the failure point and "now" cannot be
/// recovered. Consumers must re-bootstrap from a fresh snapshot.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The store was dropped; no further events will ever arrive.
    #[error("change feed closed")]
    Closed,

    /// The subscriber fell behind the feed ring and missed events.
    #[error("change feed lagged, {0} events missed")]
    Lagged(u64),
}

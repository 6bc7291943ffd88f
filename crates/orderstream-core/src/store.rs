//! The in-process change source: an insertion-ordered order collection
//! whose committed mutations are observable as a live, ordered feed.
//!
//! Every mutating call commits and emits its [`ChangeEvent`] while holding
//! the store's write lock, so feed order always equals commit order. The
//! feed is a bounded broadcast ring: a subscriber that falls further
//! behind than the ring capacity observes [`FeedError::Lagged`] and must
//! re-bootstrap, since the feed carries no resume cursor.

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{FeedError, StoreError};
use crate::event::ChangeEvent;
use crate::order::{NewOrder, Order, OrderId, OrderPatch};

/// Default capacity of the change-feed broadcast ring.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// Configuration for an [`OrderStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the change-feed ring. Subscribers that fall further
    /// behind than this many events are lagged out of the feed.
    pub feed_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

/// Live subscription to a store's change feed.
///
/// Starts from "now": events committed before [`OrderStore::subscribe`]
/// was called are never delivered.
pub struct ChangeFeed {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeFeed {
    /// Awaits the next change event.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Closed`] once the store is gone and all
    /// buffered events are drained, or [`FeedError::Lagged`] if this
    /// subscriber missed events. Both are terminal for the subscription.
    pub async fn recv(&mut self) -> Result<ChangeEvent, FeedError> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => FeedError::Closed,
            broadcast::error::RecvError::Lagged(n) => FeedError::Lagged(n),
        })
    }

    /// Returns the next buffered event without waiting, if any.
    ///
    /// # Errors
    ///
    /// Same terminal conditions as [`recv`](Self::recv); an empty feed is
    /// `Ok(None)`, not an error.
    pub fn try_recv(&mut self) -> Result<Option<ChangeEvent>, FeedError> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(FeedError::Closed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Err(FeedError::Lagged(n)),
        }
    }
}

struct Inner {
    /// Orders in creation order (oldest first), keyed by canonical id.
    orders: IndexMap<OrderId, Order>,
    /// Next identifier to assign.
    next_id: u64,
}

/// The change source: accepts writes and exposes an ordered feed of
/// change events against its current contents.
///
/// Explicitly constructed and explicitly owned; share it via `Arc` with
/// whatever needs it.
pub struct OrderStore {
    inner: RwLock<Inner>,
    feed: broadcast::Sender<ChangeEvent>,
}

impl OrderStore {
    /// Creates an empty store with the given configuration.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let (feed, _) = broadcast::channel(config.feed_capacity.max(1));
        Self {
            inner: RwLock::new(Inner {
                orders: IndexMap::new(),
                next_id: 1,
            }),
            feed,
        }
    }

    /// Opens a live subscription starting from "now".
    #[must_use]
    pub fn subscribe(&self) -> ChangeFeed {
        ChangeFeed {
            rx: self.feed.subscribe(),
        }
    }

    /// Creates an order, assigning its id and `updated_at`, and emits one
    /// `insert` event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if either name is empty; nothing
    /// is committed and no event is emitted.
    pub fn create(&self, new: NewOrder) -> Result<OrderId, StoreError> {
        validate_name("customer_name", &new.customer_name)?;
        validate_name("product_name", &new.product_name)?;

        let mut inner = self.inner.write();
        let id = OrderId::from(inner.next_id);
        inner.next_id += 1;

        let order = Order {
            id: id.clone(),
            customer_name: new.customer_name,
            product_name: new.product_name,
            status: new.status,
            updated_at: Utc::now(),
        };
        inner.orders.insert(id.clone(), order.clone());
        // Emitted under the write lock so feed order equals commit order.
        let _ = self.feed.send(ChangeEvent::insert(order));
        debug!(id = %id, "order created");
        Ok(id)
    }

    /// Applies a partial update and emits one `update` event.
    ///
    /// Returns the affected count: 1 when `id` exists, 0 otherwise. A
    /// missing `id` is a no-op, not an error, and emits no event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if a present name field is
    /// empty; nothing is committed and no event is emitted.
    pub fn update(&self, id: &OrderId, patch: OrderPatch) -> Result<usize, StoreError> {
        if let Some(name) = &patch.customer_name {
            validate_name("customer_name", name)?;
        }
        if let Some(name) = &patch.product_name {
            validate_name("product_name", name)?;
        }

        let mut inner = self.inner.write();
        let Some(order) = inner.orders.get_mut(id) else {
            return Ok(0);
        };
        if let Some(name) = patch.customer_name {
            order.customer_name = name;
        }
        if let Some(name) = patch.product_name {
            order.product_name = name;
        }
        if let Some(status) = patch.status {
            order.status = status;
        }
        order.updated_at = Utc::now();
        let updated = order.clone();
        let _ = self.feed.send(ChangeEvent::update(updated));
        debug!(id = %id, "order updated");
        Ok(1)
    }

    /// Removes an order and emits one `delete` event.
    ///
    /// Returns the affected count: 1 when `id` existed, 0 otherwise. A
    /// missing `id` is a no-op and emits no event.
    pub fn delete(&self, id: &OrderId) -> usize {
        let mut inner = self.inner.write();
        if inner.orders.shift_remove(id).is_none() {
            return 0;
        }
        let _ = self.feed.send(ChangeEvent::delete(id.clone()));
        debug!(id = %id, "order deleted");
        1
    }

    /// Returns one page of orders, newest-created-first.
    ///
    /// `page` is 1-based; both arguments are clamped to at least 1.
    #[must_use]
    pub fn list(&self, page: usize, limit: usize) -> Vec<Order> {
        let page = page.max(1);
        let limit = limit.max(1);
        let inner = self.inner.read();
        inner
            .orders
            .values()
            .rev()
            .skip((page - 1) * limit)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Looks up a single order by id.
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<Order> {
        self.inner.read().orders.get(id).cloned()
    }

    /// Number of orders currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().orders.len()
    }

    /// Whether the store holds no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().orders.is_empty()
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore")
            .field("orders", &self.len())
            .finish_non_exhaustive()
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} must be non-empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Operation;
    use crate::order::OrderStatus;

    fn new_order(customer: &str, product: &str) -> NewOrder {
        NewOrder {
            customer_name: customer.into(),
            product_name: product.into(),
            status: OrderStatus::Pending,
        }
    }

    #[test]
    fn test_create_assigns_id_and_defaults() {
        let store = OrderStore::default();
        let id = store.create(new_order("Ana", "Desk")).unwrap();

        let order = store.get(&id).unwrap();
        assert_eq!(order.customer_name, "Ana");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_create_rejects_empty_names() {
        let store = OrderStore::default();
        let mut feed = store.subscribe();

        assert!(store.create(new_order("", "Desk")).is_err());
        assert!(store.create(new_order("Ana", "  ")).is_err());
        assert_eq!(store.len(), 0);
        assert!(feed.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_update_applies_partial_fields() {
        let store = OrderStore::default();
        let id = store.create(new_order("Ana", "Desk")).unwrap();

        let affected = store
            .update(
                &id,
                OrderPatch {
                    status: Some(OrderStatus::Shipped),
                    ..OrderPatch::default()
                },
            )
            .unwrap();
        assert_eq!(affected, 1);

        let order = store.get(&id).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.customer_name, "Ana");
    }

    #[test]
    fn test_write_to_missing_id_is_noop() {
        let store = OrderStore::default();
        let mut feed = store.subscribe();
        let missing = OrderId::new("999");

        let affected = store.update(&missing, OrderPatch::default()).unwrap();
        assert_eq!(affected, 0);
        assert_eq!(store.delete(&missing), 0);
        assert!(feed.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_feed_order_matches_commit_order() {
        let store = OrderStore::default();
        let mut feed = store.subscribe();

        let id = store.create(new_order("Ana", "Desk")).unwrap();
        store
            .update(
                &id,
                OrderPatch {
                    status: Some(OrderStatus::Delivered),
                    ..OrderPatch::default()
                },
            )
            .unwrap();
        store.delete(&id);

        let ops: Vec<Operation> = std::iter::from_fn(|| feed.try_recv().unwrap())
            .map(|e| e.operation_type)
            .collect();
        assert_eq!(
            ops,
            vec![Operation::Insert, Operation::Update, Operation::Delete]
        );
    }

    #[test]
    fn test_feed_starts_from_now() {
        let store = OrderStore::default();
        store.create(new_order("Ana", "Desk")).unwrap();

        let mut feed = store.subscribe();
        assert!(feed.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_delete_event_carries_key_only() {
        let store = OrderStore::default();
        let id = store.create(new_order("Ana", "Desk")).unwrap();
        let mut feed = store.subscribe();

        store.delete(&id);
        let event = feed.try_recv().unwrap().unwrap();
        assert_eq!(event.operation_type, Operation::Delete);
        assert!(event.full_document.is_none());
        assert_eq!(event.id(), &id);
    }

    #[test]
    fn test_list_is_newest_first_and_paginated() {
        let store = OrderStore::default();
        for i in 0..5 {
            store
                .create(new_order(&format!("c{i}"), &format!("p{i}")))
                .unwrap();
        }

        let first = store.list(1, 2);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].customer_name, "c4");
        assert_eq!(first[1].customer_name, "c3");

        let third = store.list(3, 2);
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].customer_name, "c0");

        assert!(store.list(4, 2).is_empty());
    }

    #[test]
    fn test_list_order_survives_deletion() {
        let store = OrderStore::default();
        let a = store.create(new_order("a", "pa")).unwrap();
        store.create(new_order("b", "pb")).unwrap();
        store.create(new_order("c", "pc")).unwrap();

        store.delete(&a);
        let names: Vec<_> = store
            .list(1, 10)
            .into_iter()
            .map(|o| o.customer_name)
            .collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_feed_closed_when_store_dropped() {
        let store = OrderStore::default();
        let mut feed = store.subscribe();
        drop(store);

        assert!(matches!(feed.recv().await, Err(FeedError::Closed)));
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_out() {
        let store = OrderStore::new(StoreConfig { feed_capacity: 2 });
        let mut feed = store.subscribe();

        for i in 0..4 {
            store
                .create(new_order(&format!("c{i}"), &format!("p{i}")))
                .unwrap();
        }

        assert!(matches!(feed.recv().await, Err(FeedError::Lagged(_))));
    }
}

//! The client-side reconciler state machine.
//!
//! Two states for the life of a session:
//!
//! - **Bootstrapping**: events are buffered, not applied. The live
//!   subscription is opened before the snapshot fetch completes, so
//!   early events land here instead of being dropped.
//! - **Synchronized**: the snapshot has replaced the list wholesale and
//!   every buffered event has been applied in arrival order; each
//!   further event is applied immediately.
//!
//! Identifier comparisons go through [`OrderId`]'s canonical form, so a
//! snapshot record and an event record always match regardless of how
//! either transport serialized the id.

use orderstream_core::{ChangeEvent, Operation, Order, OrderId};

enum State {
    Bootstrapping { buffered: Vec<ChangeEvent> },
    Synchronized,
}

/// Maintains a local ordered list of orders from a snapshot plus a
/// stream of change events.
///
/// Within the list, `id` is unique and relative order is insertion order
/// of local knowledge, newest-known-insert first. Insert is the only
/// operation that changes ordering (by prepending); update/replace touch
/// only the matched entry in place.
pub struct OrderReconciler {
    orders: Vec<Order>,
    state: State,
}

impl OrderReconciler {
    /// Creates a reconciler in the Bootstrapping state with an empty
    /// list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: Vec::new(),
            state: State::Bootstrapping {
                buffered: Vec::new(),
            },
        }
    }

    /// Whether the snapshot has landed and events apply immediately.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        matches!(self.state, State::Synchronized)
    }

    /// The current local list, newest-known-insert first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Number of orders known locally.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the local list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Feeds one change event into the state machine.
    ///
    /// While Bootstrapping the event is buffered; once Synchronized it
    /// is applied immediately.
    pub fn apply(&mut self, event: ChangeEvent) {
        match &mut self.state {
            State::Bootstrapping { buffered } => buffered.push(event),
            State::Synchronized => self.apply_now(event),
        }
    }

    /// Completes bootstrapping: replaces the local list wholesale with
    /// the snapshot, then applies every buffered event in arrival order.
    pub fn complete_snapshot(&mut self, snapshot: Vec<Order>) {
        self.orders = snapshot;
        let buffered = match std::mem::replace(&mut self.state, State::Synchronized) {
            State::Bootstrapping { buffered } => buffered,
            State::Synchronized => Vec::new(),
        };
        for event in buffered {
            self.apply_now(event);
        }
    }

    fn apply_now(&mut self, event: ChangeEvent) {
        match event.operation_type {
            Operation::Insert | Operation::Update | Operation::Replace => {
                if let Some(order) = event.full_document {
                    self.upsert(order);
                }
            }
            Operation::Delete => self.remove(&event.document_key.id),
        }
    }

    /// Replaces the entry with the same id in place, or prepends.
    ///
    /// Shared by all three document-carrying operations: a duplicate
    /// insert must not duplicate the id, and an update for an id missed
    /// during a prior failed snapshot degrades to an insert.
    fn upsert(&mut self, order: Order) {
        match self.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => self.orders.insert(0, order),
        }
    }

    fn remove(&mut self, id: &OrderId) {
        self.orders.retain(|o| &o.id != id);
    }
}

impl Default for OrderReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderReconciler")
            .field("orders", &self.orders.len())
            .field("synchronized", &self.is_synchronized())
            .finish_non_exhaustive()
    }
}

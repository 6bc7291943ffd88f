//! The change relay: bridges exactly one store subscription to the
//! session registry's broadcast-to-all primitive.
//!
//! The relay runs as a single tokio task, so at most one broadcast is in
//! flight at a time; an event arriving mid-broadcast queues on the feed
//! and goes out next, preserving delivery order. Feed termination
//! (closed or lagged) is terminal: without a resume cursor, resubscribing
//! would silently lose the events between failure and recovery, so the
//! relay severs every session and surfaces the failure to the hosting
//! process instead.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use orderstream_core::store::ChangeFeed;
use orderstream_core::ServerMessage;

use crate::registry::SessionRegistry;

/// Lifecycle state of a relay instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Relaying events from the feed.
    Running,
    /// Feed terminated; all sessions severed. Terminal.
    Failed,
    /// Shut down on request. Terminal.
    Stopped,
}

/// Handle to a spawned relay task.
pub struct RelayHandle {
    /// Task join handle.
    pub join: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
    state_rx: watch::Receiver<RelayState>,
}

impl RelayHandle {
    /// Current relay state.
    #[must_use]
    pub fn state(&self) -> RelayState {
        *self.state_rx.borrow()
    }

    /// Requests shutdown. The task drains nothing and exits promptly.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Waits for the relay to reach a terminal state and returns it.
    pub async fn wait(&mut self) -> RelayState {
        loop {
            let state = *self.state_rx.borrow_and_update();
            if state != RelayState::Running {
                return state;
            }
            if self.state_rx.changed().await.is_err() {
                return *self.state_rx.borrow();
            }
        }
    }
}

/// Bridges one [`ChangeFeed`] subscription to a [`SessionRegistry`].
pub struct ChangeRelay;

impl ChangeRelay {
    /// Spawns the relay task over the given feed and registry.
    ///
    /// Broadcast accounting lands on the registry's metrics; the relay
    /// itself keeps no state beyond its lifecycle flag.
    #[must_use]
    pub fn spawn(mut feed: ChangeFeed, registry: Arc<SessionRegistry>) -> RelayHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(RelayState::Running);

        let join = tokio::spawn(async move {
            info!("change relay started");

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.changed() => {
                        info!("change relay shutting down");
                        let _ = state_tx.send(RelayState::Stopped);
                        break;
                    }

                    result = feed.recv() => match result {
                        Ok(event) => {
                            let msg = ServerMessage::order_update(event);
                            let payload = match serde_json::to_vec(&msg) {
                                Ok(json) => Bytes::from(json),
                                Err(e) => {
                                    error!(error = %e, "failed to serialize change event");
                                    continue;
                                }
                            };
                            let outcome = registry.broadcast(&payload);
                            debug!(
                                sent = outcome.sent,
                                dropped = outcome.dropped,
                                "change event broadcast"
                            );
                        }
                        Err(e) => {
                            // Fatal: no cursor to resume from. Sever all
                            // sessions so clients re-bootstrap, and leave
                            // restart to the hosting process.
                            error!(error = %e, "change feed terminated, relay failed");
                            registry.disconnect_all();
                            let _ = state_tx.send(RelayState::Failed);
                            break;
                        }
                    }
                }
            }
        });

        RelayHandle {
            join,
            shutdown: shutdown_tx,
            state_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use orderstream_core::{NewOrder, OrderStatus, OrderStore, StoreConfig};

    fn new_order(customer: &str) -> NewOrder {
        NewOrder {
            customer_name: customer.into(),
            product_name: "Desk".into(),
            status: OrderStatus::Pending,
        }
    }

    fn pipeline(store: &OrderStore) -> (Arc<SessionRegistry>, RelayHandle) {
        let metrics = Arc::new(crate::metrics::RelayMetrics::new());
        let registry = Arc::new(SessionRegistry::new(64, metrics));
        let handle = ChangeRelay::spawn(store.subscribe(), Arc::clone(&registry));
        (registry, handle)
    }

    async fn recv_json(rx: &mut tokio::sync::mpsc::Receiver<Bytes>) -> serde_json::Value {
        let payload = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for broadcast")
            .expect("session channel closed");
        serde_json::from_slice(&payload).unwrap()
    }

    #[tokio::test]
    async fn test_events_reach_registered_session() {
        let store = OrderStore::default();
        let (registry, handle) = pipeline(&store);
        let (_id, mut rx) = registry.register();

        store.create(new_order("Ana")).unwrap();

        let msg = recv_json(&mut rx).await;
        assert_eq!(msg["type"], "order_update");
        assert_eq!(msg["operationType"], "insert");
        assert_eq!(msg["fullDocument"]["customer_name"], "Ana");

        handle.shutdown();
        let _ = handle.join.await;
    }

    #[tokio::test]
    async fn test_delivery_order_matches_commit_order() {
        let store = OrderStore::default();
        let (registry, handle) = pipeline(&store);
        let (_id, mut rx) = registry.register();

        let id = store.create(new_order("Ana")).unwrap();
        store
            .update(
                &id,
                orderstream_core::OrderPatch {
                    status: Some(OrderStatus::Shipped),
                    ..Default::default()
                },
            )
            .unwrap();
        store.delete(&id);

        let ops: Vec<String> = [
            recv_json(&mut rx).await,
            recv_json(&mut rx).await,
            recv_json(&mut rx).await,
        ]
        .iter()
        .map(|m| m["operationType"].as_str().unwrap().to_owned())
        .collect();
        assert_eq!(ops, vec!["insert", "update", "delete"]);

        handle.shutdown();
        let _ = handle.join.await;
    }

    #[tokio::test]
    async fn test_two_sessions_both_receive_delete() {
        let store = OrderStore::default();
        let (registry, handle) = pipeline(&store);

        // Probe session: once it has seen the insert, the broadcast is
        // done and later registrations cannot receive it.
        let (probe, mut probe_rx) = registry.register();
        let id = store.create(new_order("Ana")).unwrap();
        assert_eq!(recv_json(&mut probe_rx).await["operationType"], "insert");
        registry.unregister(probe);

        let (_a, mut rx_a) = registry.register();
        let (_b, mut rx_b) = registry.register();

        store.delete(&id);

        let msg_a = recv_json(&mut rx_a).await;
        let msg_b = recv_json(&mut rx_b).await;
        assert_eq!(msg_a, msg_b);
        assert_eq!(msg_a["operationType"], "delete");

        handle.shutdown();
        let _ = handle.join.await;
    }

    #[tokio::test]
    async fn test_feed_closure_fails_relay_and_severs_sessions() {
        let store = OrderStore::default();
        let (registry, mut handle) = pipeline(&store);
        let (_id, mut rx) = registry.register();

        drop(store);

        assert_eq!(handle.wait().await, RelayState::Failed);
        assert_eq!(registry.session_count(), 0);
        assert!(rx.recv().await.is_none());
        let _ = handle.join.await;
    }

    #[tokio::test]
    async fn test_feed_lag_fails_relay() {
        let store = OrderStore::new(StoreConfig { feed_capacity: 2 });
        let metrics = Arc::new(crate::metrics::RelayMetrics::new());
        let registry = Arc::new(SessionRegistry::new(64, metrics));
        let feed = store.subscribe();

        // Overrun the feed ring before the relay task gets to run.
        for i in 0..8 {
            store.create(new_order(&format!("c{i}"))).unwrap();
        }

        let mut handle = ChangeRelay::spawn(feed, Arc::clone(&registry));
        assert_eq!(handle.wait().await, RelayState::Failed);
        let _ = handle.join.await;
    }

    #[tokio::test]
    async fn test_shutdown_is_clean_stop() {
        let store = OrderStore::default();
        let (_registry, mut handle) = pipeline(&store);

        handle.shutdown();
        assert_eq!(handle.wait().await, RelayState::Stopped);
        let _ = handle.join.await;
    }
}

//! The publish hub and its connection registry.
//!
//! The registry is owned by the broadcaster and driven by explicit
//! lifecycle calls from the WebSocket handler: [`Broadcaster::register`]
//! on connect, [`Broadcaster::identify`] when the client declares who it
//! is, [`Broadcaster::unregister`] on disconnect. No ambient globals.
//!
//! Sends go through per-connection unbounded channels; a send to a gone
//! connection is not an error visible to the triggering request - the
//! connection is silently pruned.

use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use tradepost_core::{EventScope, StoreEvent, UserId};

/// Opaque handle for one live WebSocket connection.
pub type ConnectionId = Uuid;

/// Sender half of a connection's outgoing frame channel.
pub type FrameSender = mpsc::UnboundedSender<String>;

struct Connection {
    /// Set once the client declares its identity; a connection without it
    /// still receives globally scoped events.
    user_id: Option<UserId>,
    tx: FrameSender,
}

/// Publish hub fanning events out to connected clients.
///
/// Safe for concurrent use from any number of request handlers; the
/// registry maps support concurrent insert/remove/lookup.
#[derive(Default)]
pub struct Broadcaster {
    connections: DashMap<ConnectionId, Connection>,
    users: DashMap<UserId, HashSet<ConnectionId>>,
}

impl Broadcaster {
    /// Create an empty broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection, returning its handle.
    pub fn register(&self, tx: FrameSender) -> ConnectionId {
        let id = Uuid::new_v4();
        self.connections.insert(id, Connection { user_id: None, tx });
        id
    }

    /// Attach a user identity to a connection.
    ///
    /// A user may hold several connections (multiple tabs/devices); each
    /// one is tracked in the user's connection set until it unregisters.
    pub fn identify(&self, connection_id: ConnectionId, user_id: UserId) {
        let Some(mut connection) = self.connections.get_mut(&connection_id) else {
            return;
        };

        if let Some(previous) = connection.user_id.replace(user_id) {
            if previous == user_id {
                return;
            }
            self.remove_from_user_set(previous, connection_id);
        }
        drop(connection);

        self.users
            .entry(user_id)
            .or_default()
            .insert(connection_id);
    }

    /// Remove a connection from the registry.
    pub fn unregister(&self, connection_id: ConnectionId) {
        if let Some((_, connection)) = self.connections.remove(&connection_id) {
            if let Some(user_id) = connection.user_id {
                self.remove_from_user_set(user_id, connection_id);
            }
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Publish an event to the connections in its scope.
    ///
    /// At-most-once, fire-and-forget: connections whose channel is gone
    /// are pruned and nothing is reported back to the caller.
    pub fn publish(&self, event: &StoreEvent) {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(event = event.name(), error = %e, "Failed to serialize event");
                return;
            }
        };

        let targets: Vec<ConnectionId> = match event.scope() {
            EventScope::All => self.connections.iter().map(|entry| *entry.key()).collect(),
            EventScope::User(user_id) => self
                .users
                .get(&user_id)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default(),
        };

        let mut dead = Vec::new();
        for connection_id in targets {
            if let Some(connection) = self.connections.get(&connection_id) {
                if connection.tx.send(frame.clone()).is_err() {
                    dead.push(connection_id);
                }
            }
        }

        for connection_id in dead {
            tracing::debug!(%connection_id, "Pruning dead connection");
            self.unregister(connection_id);
        }
    }

    fn remove_from_user_set(&self, user_id: UserId, connection_id: ConnectionId) {
        if let Some(mut set) = self.users.get_mut(&user_id) {
            set.remove(&connection_id);
            let now_empty = set.is_empty();
            drop(set);
            if now_empty {
                self.users.remove_if(&user_id, |_, set| set.is_empty());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tradepost_core::ProductId;

    fn cart_event(user: i32) -> StoreEvent {
        StoreEvent::CartAdded {
            user_id: UserId::new(user),
            product_id: ProductId::new(9),
        }
    }

    fn global_event() -> StoreEvent {
        StoreEvent::ProductDeleted(ProductId::new(5))
    }

    #[tokio::test]
    async fn test_global_event_reaches_every_connection() {
        let broadcaster = Broadcaster::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        broadcaster.register(tx_a);
        broadcaster.register(tx_b);

        broadcaster.publish(&global_event());

        let frame_a = rx_a.recv().await.unwrap();
        let frame_b = rx_b.recv().await.unwrap();
        assert_eq!(frame_a, frame_b);
        assert!(frame_a.contains("product:deleted"));
    }

    #[tokio::test]
    async fn test_user_event_reaches_only_named_user() {
        let broadcaster = Broadcaster::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let conn_a = broadcaster.register(tx_a);
        let conn_b = broadcaster.register(tx_b);
        broadcaster.identify(conn_a, UserId::new(1));
        broadcaster.identify(conn_b, UserId::new(2));

        broadcaster.publish(&cart_event(1));

        assert!(rx_a.recv().await.unwrap().contains("cart:added"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_user_event_reaches_all_of_users_connections() {
        let broadcaster = Broadcaster::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let conn_a = broadcaster.register(tx_a);
        let conn_b = broadcaster.register(tx_b);
        broadcaster.identify(conn_a, UserId::new(1));
        broadcaster.identify(conn_b, UserId::new(1));

        broadcaster.publish(&cart_event(1));

        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_unidentified_connection_misses_user_scoped_events() {
        let broadcaster = Broadcaster::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.register(tx);

        broadcaster.publish(&cart_event(1));

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_user_event_with_no_connections_is_silently_dropped() {
        let broadcaster = Broadcaster::new();
        // Nothing registered; must not panic or error
        broadcaster.publish(&cart_event(1));
    }

    #[tokio::test]
    async fn test_dead_connection_is_pruned_on_publish() {
        let broadcaster = Broadcaster::new();
        let (tx, rx) = mpsc::unbounded_channel();
        broadcaster.register(tx);
        drop(rx);

        assert_eq!(broadcaster.connection_count(), 1);
        broadcaster.publish(&global_event());
        assert_eq!(broadcaster.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_unregister_removes_from_user_set() {
        let broadcaster = Broadcaster::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = broadcaster.register(tx);
        broadcaster.identify(conn, UserId::new(1));
        broadcaster.unregister(conn);

        broadcaster.publish(&cart_event(1));

        assert_eq!(broadcaster.connection_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reidentify_moves_connection_between_users() {
        let broadcaster = Broadcaster::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = broadcaster.register(tx);
        broadcaster.identify(conn, UserId::new(1));
        broadcaster.identify(conn, UserId::new(2));

        broadcaster.publish(&cart_event(1));
        assert!(rx.try_recv().is_err());

        broadcaster.publish(&cart_event(2));
        assert!(rx.recv().await.is_some());
    }
}

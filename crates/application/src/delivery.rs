//! Outbound fan-out.
//!
//! One unbounded channel per live connection; the socket task on the other
//! end forwards events onto the wire. A send into a closed or missing
//! channel is skipped with a log line: a disconnect racing a broadcast is a
//! harmless no-op delivery, never an error.

use std::collections::HashMap;

use domain::{ConnectionId, ServerEvent};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

#[derive(Default)]
pub struct EventSinkRegistry {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl EventSinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        self.senders.write().await.insert(connection_id, sender);
    }

    /// Dropping the sender ends the socket's forwarding task after queued
    /// events have drained, which closes the connection.
    pub async fn unregister(&self, connection_id: ConnectionId) {
        self.senders.write().await.remove(&connection_id);
    }

    pub async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) {
        let senders = self.senders.read().await;
        match senders.get(&connection_id) {
            Some(sender) => {
                if sender.send(event).is_err() {
                    warn!(%connection_id, "delivery to closed connection skipped");
                }
            }
            None => debug!(%connection_id, "delivery to unknown connection skipped"),
        }
    }

    pub async fn send_to_many(&self, connection_ids: &[ConnectionId], event: ServerEvent) {
        let senders = self.senders.read().await;
        for connection_id in connection_ids {
            if let Some(sender) = senders.get(connection_id) {
                if sender.send(event.clone()).is_err() {
                    warn!(%connection_id, "delivery to closed connection skipped");
                }
            }
        }
    }

    /// Process-wide push (room creation notices).
    pub async fn broadcast_all(&self, event: ServerEvent) {
        let senders = self.senders.read().await;
        for (connection_id, sender) in senders.iter() {
            if sender.send(event.clone()).is_err() {
                warn!(%connection_id, "broadcast to closed connection skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_to_missing_connection_does_not_panic() {
        let sinks = EventSinkRegistry::new();
        sinks
            .send_to(
                ConnectionId::generate(),
                ServerEvent::Error {
                    message: "nobody home".to_string(),
                },
            )
            .await;
    }

    #[tokio::test]
    async fn send_to_closed_connection_is_tolerated() {
        let sinks = EventSinkRegistry::new();
        let conn = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        sinks.register(conn, tx).await;
        drop(rx);

        sinks
            .send_to(
                conn,
                ServerEvent::Error {
                    message: "late delivery".to_string(),
                },
            )
            .await;
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_sink() {
        let sinks = EventSinkRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        sinks.register(ConnectionId::generate(), tx_a).await;
        sinks.register(ConnectionId::generate(), tx_b).await;

        sinks
            .broadcast_all(ServerEvent::Error {
                message: "hi".to_string(),
            })
            .await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }
}

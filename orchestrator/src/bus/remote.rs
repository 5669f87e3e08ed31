//! Cross-process fan-out channel abstraction (§4.1 "Remote" delivery).
//!
//! `RemoteChannel` is the seam a real deployment plugs a message broker (NATS, Redis
//! pub/sub, a Kafka topic) into. `BroadcastRemoteChannel` is the in-process stand-in used
//! by tests and single-node deployments: a `tokio::sync::broadcast` channel shared by
//! `Arc` across every `EventBus` that wants to simulate "the shared pub/sub channel".

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::error::BusError;
use super::event::RemoteMessage;

/// The shared channel every `EventBus` publishes remote messages to and receives them from.
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Fire-and-forget publish; at-most-once, no delivery confirmation.
    async fn publish(&self, message: RemoteMessage) -> Result<(), BusError>;

    /// A fresh receiver for incoming messages (including this channel's own publishes --
    /// loop prevention on `origin_node` happens one layer up in `EventBus`).
    fn subscribe(&self) -> broadcast::Receiver<RemoteMessage>;
}

/// In-process broadcast-backed `RemoteChannel`. Clone to simulate multiple nodes sharing
/// one logical channel in tests.
#[derive(Clone)]
pub struct BroadcastRemoteChannel {
    tx: broadcast::Sender<RemoteMessage>,
}

impl BroadcastRemoteChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for BroadcastRemoteChannel {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl RemoteChannel for BroadcastRemoteChannel {
    async fn publish(&self, message: RemoteMessage) -> Result<(), BusError> {
        // A send error here means there are currently no receivers; remote publish is
        // fire-and-forget so this is not escalated to the emitter (§4.1 failure model).
        let _ = self.tx.send(message);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteMessage> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(origin: &str) -> RemoteMessage {
        RemoteMessage {
            event_id: "e1".into(),
            event_type: "task.completed".into(),
            source: "supervisor".into(),
            target: None,
            payload: json!({}),
            timestamp: chrono::Utc::now(),
            correlation_id: None,
            priority: 0,
            origin_node: origin.into(),
        }
    }

    #[tokio::test]
    async fn published_message_is_observed_by_subscriber() {
        let channel = BroadcastRemoteChannel::new(16);
        let mut rx = channel.subscribe();
        channel.publish(sample("node-a")).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.origin_node, "node-a");
    }
}

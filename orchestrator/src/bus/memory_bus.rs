//! In-process pub/sub implementation of the Event Bus (§4.1).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{oneshot, Mutex, OnceCell};
use tracing::warn;
use uuid::Uuid;

use super::error::BusError;
use super::event::Event;
use super::remote::RemoteChannel;

/// One registered local subscriber.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event);
}

/// Wraps a plain closure as an `EventHandler`, for callers that don't want a named type.
pub struct FnHandler<F>(F);

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(Event) + Send + Sync,
{
    async fn handle(&self, event: Event) {
        (self.0)(event)
    }
}

/// Token returned by `subscribe`, passed back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
}

/// The orchestrator's Event Bus (§4.1): local fan-out to in-process subscribers, plus
/// optional fan-out to a shared `RemoteChannel` for other nodes in the deployment.
///
/// Delivery is at-most-once per subscriber per event: a handler that errors or panics is
/// isolated (its failure is counted, never propagated to the emitter or other subscribers).
/// Per-`(event_type, subscriber)` ordering is preserved because handlers for one event type
/// run sequentially in subscription order; handlers for different event types do not
/// synchronize with each other.
pub struct EventBus {
    node_id: String,
    subscribers: DashMap<String, Vec<Subscriber>>,
    pending_requests: DashMap<String, oneshot::Sender<Event>>,
    next_subscription_id: AtomicU64,
    subscriber_errors_total: AtomicU64,
    remote: OnceCell<Arc<dyn RemoteChannel>>,
    remote_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl EventBus {
    pub fn new(node_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            node_id: node_id.into(),
            subscribers: DashMap::new(),
            pending_requests: DashMap::new(),
            next_subscription_id: AtomicU64::new(1),
            subscriber_errors_total: AtomicU64::new(0),
            remote: OnceCell::new(),
            remote_task: Mutex::new(None),
        })
    }

    /// Attaches a shared `RemoteChannel` and spawns the receive loop that re-injects
    /// remote messages as local events, dropping anything this node itself published
    /// (`origin_node` loop prevention, §4.1 Failure model). May be called at most once
    /// per bus, any time after construction -- existing subscribers are unaffected.
    pub async fn with_remote(self: &Arc<Self>, remote: Arc<dyn RemoteChannel>) {
        let mut rx = remote.subscribe();
        if self.remote.set(remote).is_err() {
            warn!("event bus already has a remote channel attached, ignoring");
            return;
        }
        let node_id = self.node_id.clone();
        let bus = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => {
                        if message.origin_node == node_id {
                            continue;
                        }
                        bus.dispatch_local(message.into_event()).await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event bus remote receiver lagged, messages dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self.remote_task.lock().await = Some(task);
    }

    pub fn subscriber_errors_total(&self) -> u64 {
        self.subscriber_errors_total.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .entry(event_type.into())
            .or_default()
            .push(Subscriber { id, handler });
        id
    }

    pub fn unsubscribe(&self, event_type: &str, id: SubscriptionId) {
        if let Some(mut subs) = self.subscribers.get_mut(event_type) {
            subs.retain(|s| s.id != id);
        }
    }

    /// Publishes `event` to local subscribers of `event.event_type`, then (unless
    /// `publish_remote` is false) to the shared remote channel.
    pub async fn emit(&self, event: Event, publish_remote: bool) {
        // A pending `request()` waiting on this exact event_id is resolved first.
        if let Some((_, sender)) = self.pending_requests.remove(&event.event_id) {
            let _ = sender.send(event.clone());
        }

        self.dispatch_local(event.clone()).await;

        if publish_remote {
            if let Some(remote) = self.remote.get() {
                let message = super::event::RemoteMessage::from_event(&event, self.node_id.clone());
                if let Err(err) = remote.publish(message).await {
                    warn!(error = %err, "failed to publish event to remote channel");
                }
            }
        }
    }

    async fn dispatch_local(&self, event: Event) {
        let Some(subs) = self.subscribers.get(&event.event_type) else {
            return;
        };
        for sub in subs.iter() {
            // Each handler runs to completion before the next; a handler that panics
            // would otherwise poison the bus for every other subscriber of this type, so
            // we isolate failures by catching the unwind boundary at the task level.
            let handler = Arc::clone(&sub.handler);
            let event = event.clone();
            let outcome = tokio::spawn(async move {
                handler.handle(event).await;
            })
            .await;
            if outcome.is_err() {
                self.subscriber_errors_total.fetch_add(1, Ordering::Relaxed);
                warn!(event_type = %event.event_type, "event subscriber panicked");
            }
        }
    }

    /// Emits `event` then awaits a correlated reply with the same `event_id`, or times out.
    /// Used for synchronous-looking request/response over an inherently async bus (e.g. the
    /// Approval Gate waiting on an `approval_decision`).
    pub async fn request(&self, event: Event, timeout: Duration) -> Result<Event, BusError> {
        let (tx, rx) = oneshot::channel();
        self.pending_requests.insert(event.event_id.clone(), tx);
        self.emit(event.clone(), true).await;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BusError::Timeout),
            Err(_) => {
                self.pending_requests.remove(&event.event_id);
                Err(BusError::Timeout)
            }
        }
    }

    /// Generates a correlation id for request/reply pairs that don't share an `event_id`.
    pub fn new_correlation_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    struct Flag(Arc<AtomicBool>);

    #[async_trait]
    impl EventHandler for Flag {
        async fn handle(&self, _event: Event) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn subscriber_receives_matching_event_type() {
        let bus = EventBus::new("node-a");
        let seen = Arc::new(AtomicBool::new(false));
        bus.subscribe("task.completed", Arc::new(Flag(Arc::clone(&seen))));

        bus.emit(
            Event::new("task.completed", json!({"task_id": "t1"}), "supervisor"),
            false,
        )
        .await;

        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unrelated_event_type_is_not_delivered() {
        let bus = EventBus::new("node-a");
        let seen = Arc::new(AtomicBool::new(false));
        bus.subscribe("task.completed", Arc::new(Flag(Arc::clone(&seen))));

        bus.emit(Event::new("task.failed", json!({}), "supervisor"), false)
            .await;

        assert!(!seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new("node-a");
        let seen = Arc::new(AtomicBool::new(false));
        let id = bus.subscribe("task.completed", Arc::new(Flag(Arc::clone(&seen))));
        bus.unsubscribe("task.completed", id);

        bus.emit(Event::new("task.completed", json!({}), "supervisor"), false)
            .await;

        assert!(!seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn request_without_a_reply_times_out() {
        let bus = EventBus::new("node-a");
        let event = Event::new("approval_request", json!({}), "hitl");
        let result = bus.request(event, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(BusError::Timeout)));
    }

    #[tokio::test]
    async fn request_is_resolved_by_a_reply_with_the_same_event_id() {
        let bus = EventBus::new("node-a");
        let request_event = Event::new("approval_request", json!({}), "hitl");
        let reply_id = request_event.event_id.clone();

        let bus_clone = Arc::clone(&bus);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let mut reply = Event::new("approval_decision", json!({"decision": "approve"}), "ui");
            reply.event_id = reply_id;
            bus_clone.emit(reply, false).await;
        });

        let reply = bus.request(request_event, Duration::from_secs(2)).await.unwrap();
        assert_eq!(reply.event_type, "approval_decision");
    }
}

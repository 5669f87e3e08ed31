//! Event entity (§3) and the remote wire format (§6 "Event Bus channel format").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One event published on the bus. Cloneable: delivered to N local subscribers plus,
/// when `publish_remote`, re-shaped into `RemoteMessage` for the shared channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub event_type: String,
    pub source: String,
    pub target: Option<String>,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub priority: i32,
}

impl Event {
    pub fn new(event_type: impl Into<String>, payload: Value, source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            source: source.into(),
            target: None,
            payload,
            timestamp: Utc::now(),
            correlation_id: None,
            priority: 0,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Wire shape for one remote message (§6): `Event` plus `origin_node`, the publishing
/// node's id, used for loop prevention on receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub event_id: String,
    pub event_type: String,
    pub source: String,
    pub target: Option<String>,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub priority: i32,
    pub origin_node: String,
}

impl RemoteMessage {
    pub fn from_event(event: &Event, origin_node: impl Into<String>) -> Self {
        Self {
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            source: event.source.clone(),
            target: event.target.clone(),
            payload: event.payload.clone(),
            timestamp: event.timestamp,
            correlation_id: event.correlation_id.clone(),
            priority: event.priority,
            origin_node,
        }
    }

    pub fn into_event(self) -> Event {
        Event {
            event_id: self.event_id,
            event_type: self.event_type,
            source: self.source,
            target: self.target,
            payload: self.payload,
            timestamp: self.timestamp,
            correlation_id: self.correlation_id,
            priority: self.priority,
        }
    }
}

/// Event types the core emits/consumes (§4.1).
pub mod event_types {
    pub const TASK_DELEGATED: &str = "task.delegated";
    pub const TASK_ACCEPTED: &str = "task.accepted";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const TASK_FAILED: &str = "task.failed";
    pub const RESOURCE_LOCKED: &str = "resource.locked";
    pub const RESOURCE_UNLOCKED: &str = "resource.unlocked";
    pub const AGENT_STATUS_CHANGE: &str = "agent.status_change";
    pub const APPROVAL_REQUEST: &str = "approval_request";
    pub const APPROVAL_DECISION: &str = "approval_decision";
}

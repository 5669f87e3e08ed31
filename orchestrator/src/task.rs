//! Task entity (§3): the free-form development task submitted to `/orchestrate`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Task priority (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A development task accepted at the HTTP boundary (§3 `Task`).
///
/// Immutable after assignment: once the Workflow Engine has built a `WorkflowState` for it,
/// nothing mutates `description`/`context`/`priority` in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub description: String,
    pub priority: Priority,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

impl Task {
    pub fn new(task_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            description: description.into(),
            priority: Priority::default(),
            context: HashMap::new(),
            submitted_at: Utc::now(),
        }
    }

    /// Environment tag from `context` (`prod` / `staging` / `dev`), used by the Risk Assessor.
    pub fn environment(&self) -> Option<&str> {
        self.context.get("environment").and_then(|v| v.as_str())
    }

    /// Operation class from `context` (`read` / `write` / `delete` / `deploy` / `secret`).
    pub fn operation(&self) -> Option<&str> {
        self.context.get("operation").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_reads_context_tag() {
        let mut task = Task::new("t1", "deploy to prod");
        task.context
            .insert("environment".into(), Value::String("prod".into()));
        assert_eq!(task.environment(), Some("prod"));
    }

    #[test]
    fn priority_defaults_to_medium() {
        let task = Task::new("t1", "do something");
        assert_eq!(task.priority, Priority::Medium);
    }
}

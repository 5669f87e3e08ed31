//! `WorkflowState` (§3): the state threaded through the Workflow Engine's compiled graph,
//! one instance per `/orchestrate` call, checkpointed after every node.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;
use crate::task::Task;

/// Workflow status (§3). `AwaitingApproval` and `approval_request_id` are kept in lockstep
/// by `invariant_holds` -- one is `Some`/set iff the other is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    AwaitingApproval,
    Approved,
    Rejected,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled)
    }
}

/// One in-flight (or finished) workflow run (§3 `WorkflowState`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub task_id: String,
    pub thread_id: String,
    pub description: String,
    /// The node currently (or last) executing; on suspension, the node the Supervisor
    /// routed to, so `resume` knows where to re-enter the graph.
    pub node_name: String,
    pub status: WorkflowStatus,
    pub messages: Vec<Message>,
    pub tool_selection: Vec<String>,
    pub artifacts: HashMap<String, Value>,
    pub approval_request_id: Option<String>,
    pub checkpoint_id: Option<String>,
    pub error: Option<String>,
    pub tool_round: u32,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    pub fn new(task: &Task, thread_id: impl Into<String>, entry_node: impl Into<String>) -> Self {
        Self {
            task_id: task.task_id.clone(),
            thread_id: thread_id.into(),
            description: task.description.clone(),
            node_name: entry_node.into(),
            status: WorkflowStatus::Running,
            messages: vec![Message::user(task.description.clone())],
            tool_selection: Vec::new(),
            artifacts: HashMap::new(),
            approval_request_id: None,
            checkpoint_id: None,
            error: None,
            tool_round: 0,
            updated_at: Utc::now(),
        }
    }

    /// §3 invariant: `status == AwaitingApproval` iff `approval_request_id.is_some()`.
    pub fn invariant_holds(&self) -> bool {
        (self.status == WorkflowStatus::AwaitingApproval) == self.approval_request_id.is_some()
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = WorkflowStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

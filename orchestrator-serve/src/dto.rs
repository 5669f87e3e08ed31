//! Request/response bodies for the §6 HTTP API, kept separate from the domain types so the
//! wire shape can diverge from `WorkflowState`/`Task` without touching the engine crate.

use std::collections::HashMap;

use orchestrator::{Priority, WorkflowState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MESSAGES_TAIL_LEN: usize = 20;

#[derive(Debug, Deserialize)]
pub struct OrchestrateRequest {
    pub description: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub context: Option<HashMap<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct OrchestrateResponse {
    pub task_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_request_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: String,
    pub state_summary: Value,
    pub messages_tail: Vec<Value>,
    pub artifacts: HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookApprovalRequest {
    pub request_id: String,
    pub decision: String,
    pub decided_by: String,
    #[serde(default)]
    pub justification: Option<String>,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookApprovalResponse {
    pub ok: bool,
}

impl From<&WorkflowState> for TaskResponse {
    fn from(state: &WorkflowState) -> Self {
        let messages_tail = state
            .messages
            .iter()
            .rev()
            .take(MESSAGES_TAIL_LEN)
            .rev()
            .map(|m| serde_json::to_value(m).unwrap_or(Value::Null))
            .collect();

        Self {
            task_id: state.task_id.clone(),
            status: status_str(state),
            state_summary: serde_json::json!({
                "thread_id": state.thread_id,
                "node_name": state.node_name,
                "tool_selection": state.tool_selection,
                "tool_round": state.tool_round,
                "error": state.error,
            }),
            messages_tail,
            artifacts: state.artifacts.clone(),
        }
    }
}

pub fn status_str(state: &WorkflowState) -> String {
    serde_json::to_value(state.status)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_else(|| "unknown".to_string())
}

//! `ApprovalGateNode` (§4.6): sits between the Supervisor and any state-changing
//! specialist. Asks the HITL Manager to assess risk; suspends the graph when a human
//! decision is required, otherwise routes straight through to the chosen specialist.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::OrchestratorError;
use crate::graph::{GraphInterrupt, Next, Node};
use crate::hitl::HitlManager;
use crate::task::Task;

use super::state::{WorkflowState, WorkflowStatus};

/// The node id every gated specialist's outgoing Supervisor edge routes through.
pub const APPROVAL_GATE_NODE_ID: &str = "approval_gate";

/// Routes to the specialist the Supervisor already chose (`state.node_name`), once the
/// approval gate has cleared it.
pub struct ApprovalGateNode {
    hitl: Arc<HitlManager>,
    /// Looked up from `Task` again rather than threaded through `WorkflowState`, since the
    /// risk assessment needs the full `Task` (priority, context) and not just its description.
    tasks: Arc<dashmap::DashMap<String, Task>>,
}

impl ApprovalGateNode {
    pub fn new(hitl: Arc<HitlManager>, tasks: Arc<dashmap::DashMap<String, Task>>) -> Self {
        Self { hitl, tasks }
    }
}

#[async_trait]
impl Node<WorkflowState> for ApprovalGateNode {
    fn id(&self) -> &str {
        APPROVAL_GATE_NODE_ID
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), OrchestratorError> {
        let task = self
            .tasks
            .get(&state.task_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| OrchestratorError::NotFound(state.task_id.clone()))?;

        // The compiled graph doesn't surface the last-persisted checkpoint id to node
        // implementations, so the thread id stands in: a resume always re-enters at the
        // thread's current tip checkpoint, which the thread id alone is enough to locate.
        let checkpoint_id = state.checkpoint_id.clone().unwrap_or_else(|| state.thread_id.clone());
        let target_node = state.node_name.clone();

        match self
            .hitl
            .create_request(&state.task_id, &state.thread_id, &checkpoint_id, &task, &target_node)
            .await?
        {
            None => Ok((state, Next::Node(target_node))),
            Some(request_id) => {
                state.status = WorkflowStatus::AwaitingApproval;
                state.approval_request_id = Some(request_id.clone());
                let interrupt = GraphInterrupt::new(
                    APPROVAL_GATE_NODE_ID,
                    "awaiting human approval",
                    json!({"request_id": request_id, "target_node": target_node}),
                );
                Ok((state, Next::Suspend(interrupt)))
            }
        }
    }
}

/// Builds the conditional path map for the Supervisor -> (gate | specialist) edge plus the
/// gate's own re-routing edge, from the set of registered specialist node ids.
pub fn gate_path_map(specialist_ids: &[String]) -> HashMap<String, String> {
    specialist_ids.iter().map(|id| (id.clone(), id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::bus::EventBus;
    use crate::config::ApprovalTimeouts;
    use crate::hitl::{HitlManager, NullApprovalUiClient, RiskRule};
    use crate::locks::LockManager;

    use super::*;

    fn gate_with_tasks(tasks: Vec<Task>) -> (ApprovalGateNode, Vec<Task>) {
        let hitl = HitlManager::new(
            RiskRule::default_table(),
            ApprovalTimeouts::default(),
            EventBus::new("test-node"),
            LockManager::new(None),
            Arc::new(NullApprovalUiClient),
        );
        let task_map = Arc::new(dashmap::DashMap::new());
        for task in &tasks {
            task_map.insert(task.task_id.clone(), task.clone());
        }
        (ApprovalGateNode::new(hitl, task_map), tasks)
    }

    #[tokio::test]
    async fn low_risk_task_routes_straight_to_the_chosen_specialist() {
        let task = Task::new("t1", "read the config file");
        let (gate, _tasks) = gate_with_tasks(vec![task.clone()]);
        let mut state = WorkflowState::new(&task, "thread-1", "coder");
        state.checkpoint_id = Some("c1".into());

        let (state, next) = gate.run(state).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Running);
        assert!(matches!(next, Next::Node(id) if id == "coder"));
    }

    #[tokio::test]
    async fn high_risk_task_suspends_awaiting_approval() {
        let mut task = Task::new("t1", "delete the prod database");
        task.context.insert("operation".into(), serde_json::json!("delete"));
        task.context.insert("environment".into(), serde_json::json!("prod"));
        let (gate, _tasks) = gate_with_tasks(vec![task.clone()]);
        let mut state = WorkflowState::new(&task, "thread-1", "deployer");
        state.checkpoint_id = Some("c1".into());

        let (state, next) = gate.run(state).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::AwaitingApproval);
        assert!(state.approval_request_id.is_some());
        assert!(matches!(next, Next::Suspend(_)));
    }
}

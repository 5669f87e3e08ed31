//! `Engine` (§4.6/§9): wires the six core services into one compiled graph, built once at
//! construction and `invoke`d per `/orchestrate` call with a fresh `thread_id` (§9 "one
//! process, one Engine, one compiled graph").

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::{error, info};

use crate::bus::{event_types, Event, EventBus, EventHandler};
use crate::catalog::ToolCatalog;
use crate::config::Settings;
use crate::error::OrchestratorError;
use crate::graph::{CompiledStateGraph, DefaultInterruptHandler, InvokeOutcome, RetryPolicy, StateGraph, END, START};
use crate::hitl::{Decision, HitlManager};
use crate::llm::LlmClient;
use crate::locks::LockManager;
use crate::memory::{uuid6, Checkpointer, RunnableConfig};
use crate::task::Task;
use crate::tool_gateway::ToolGatewayClient;

use super::agents::AgentNode;
use super::approval_gate::{gate_path_map, ApprovalGateNode, APPROVAL_GATE_NODE_ID};
use super::state::{WorkflowState, WorkflowStatus};
use super::supervisor::{SpecialistEntry, SupervisorNode};

/// One specialist's registration: its routing metadata plus whether it must pass through
/// the Approval Gate.
pub struct SpecialistSpec {
    pub name: String,
    pub capability: String,
    pub state_changing: bool,
}

fn build_graph(
    specialists: &[SpecialistSpec],
    default_specialist: &str,
    catalog: Arc<ToolCatalog>,
    llm: Arc<dyn LlmClient>,
    tool_gateway: Arc<dyn ToolGatewayClient>,
    hitl: Arc<HitlManager>,
    tasks: Arc<DashMap<String, Task>>,
    settings: &Settings,
    checkpointer: Arc<dyn Checkpointer<WorkflowState>>,
) -> CompiledStateGraph<WorkflowState> {
    let node_timeout = Duration::from_secs(settings.node_timeout_seconds);
    let supervisor_timeout = Duration::from_secs(settings.supervisor_timeout_seconds);
    let retry_policy = backoff_policy(&settings.llm_retry_backoff);

    let mut graph = StateGraph::<WorkflowState>::new();

    let entries: Vec<SpecialistEntry> = specialists
        .iter()
        .map(|s| SpecialistEntry { name: s.name.clone(), capability: s.capability.clone() })
        .collect();
    graph.add_node(
        "supervisor",
        Arc::new(SupervisorNode::new(entries, default_specialist, Arc::clone(&llm), supervisor_timeout)),
    );
    graph.add_node(APPROVAL_GATE_NODE_ID, Arc::new(ApprovalGateNode::new(Arc::clone(&hitl), Arc::clone(&tasks))));

    let gated: Vec<String> = specialists.iter().filter(|s| s.state_changing).map(|s| s.name.clone()).collect();
    for spec in specialists {
        graph.add_node(
            spec.name.clone(),
            Arc::new(AgentNode::new(
                spec.name.clone(),
                spec.state_changing,
                Arc::clone(&catalog),
                Arc::clone(&llm),
                Arc::clone(&tool_gateway),
                settings.tool_strategy_default,
                settings.max_tool_rounds,
                node_timeout,
                retry_policy.clone(),
            )),
        );
        graph.add_edge(spec.name.clone(), END);
    }

    graph.add_edge(START, "supervisor");
    graph.add_conditional_edges(
        "supervisor",
        Arc::new(|state: &WorkflowState| state.node_name.clone()),
        Some(gate_path_map(&gated)),
    );

    graph
        .with_interrupt_handler(Arc::new(DefaultInterruptHandler))
        .compile_with_checkpointer(checkpointer)
        .expect("workflow graph wiring is internally consistent")
}

fn backoff_policy(llm_retry_backoff: &[u64]) -> RetryPolicy {
    match llm_retry_backoff.first() {
        None => RetryPolicy::None,
        Some(&initial) => RetryPolicy::exponential(
            llm_retry_backoff.len() as u32 + 1,
            Duration::from_secs(initial.max(1)),
            Duration::from_secs(llm_retry_backoff.iter().copied().max().unwrap_or(initial).max(1)),
            2.0,
        ),
    }
}

/// The Workflow Engine: owns the compiled graph and the `task_id -> WorkflowState` cache
/// `/tasks/{task_id}` reads from (§6 endpoints).
pub struct Engine {
    settings: Settings,
    event_bus: Arc<EventBus>,
    lock_manager: Arc<LockManager>,
    hitl: Arc<HitlManager>,
    tasks: Arc<DashMap<String, Task>>,
    graph: CompiledStateGraph<WorkflowState>,
    workflows: DashMap<String, WorkflowState>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        event_bus: Arc<EventBus>,
        lock_manager: Arc<LockManager>,
        catalog: Arc<ToolCatalog>,
        hitl: Arc<HitlManager>,
        checkpointer: Arc<dyn Checkpointer<WorkflowState>>,
        llm: Arc<dyn LlmClient>,
        tool_gateway: Arc<dyn ToolGatewayClient>,
        specialists: Vec<SpecialistSpec>,
        default_specialist: impl Into<String>,
    ) -> Arc<Self> {
        let tasks = Arc::new(DashMap::new());
        let graph = build_graph(
            &specialists,
            &default_specialist.into(),
            catalog,
            llm,
            tool_gateway,
            Arc::clone(&hitl),
            Arc::clone(&tasks),
            &settings,
            checkpointer,
        );

        let engine = Arc::new(Self {
            settings,
            event_bus: Arc::clone(&event_bus),
            lock_manager,
            hitl,
            tasks,
            graph,
            workflows: DashMap::new(),
        });

        event_bus.subscribe(
            event_types::APPROVAL_DECISION,
            Arc::new(ApprovalDecisionHandler(Arc::clone(&engine))),
        );

        engine
    }

    fn lock_resource(thread_id: &str) -> String {
        format!("workflow:{thread_id}")
    }

    /// Read-only accessors for `/health` and `/metrics` (§6) -- the HTTP layer has no other
    /// way to reach the subsystems the Engine owns.
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    pub fn hitl(&self) -> &Arc<HitlManager> {
        &self.hitl
    }

    pub fn active_workflow_count(&self) -> usize {
        self.workflows.iter().filter(|e| !e.value().status.is_terminal()).count()
    }

    /// `POST /orchestrate` (§6): accepts a new task, builds its `WorkflowState`, and runs
    /// the graph to completion or the first suspension.
    pub async fn orchestrate(&self, task: Task) -> Result<WorkflowState, OrchestratorError> {
        let thread_id = uuid6().to_string();
        self.tasks.insert(task.task_id.clone(), task.clone());

        let handle = self
            .lock_manager
            .acquire(
                Self::lock_resource(&thread_id),
                "engine",
                Duration::from_secs(self.settings.lock_default_ttl_seconds),
                Duration::ZERO,
                None,
            )
            .await?;

        let state = WorkflowState::new(&task, thread_id.clone(), self.graph.first_node_id().to_string());
        let outcome = self.graph.invoke(state, RunnableConfig::for_thread(thread_id)).await;
        handle.release().await;

        self.finish(&task.task_id, &task, outcome)
    }

    /// `GET /tasks/{task_id}` (§6).
    pub fn get_task(&self, task_id: &str) -> Result<WorkflowState, OrchestratorError> {
        self.workflows
            .get(task_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| OrchestratorError::NotFound(task_id.to_string()))
    }

    /// `POST /tasks/{task_id}/resume` (§6), and the handler for `approval_decision` events
    /// the Engine subscribes to at construction. No-op when the task isn't currently
    /// suspended.
    pub async fn resume(&self, task_id: &str) -> Result<WorkflowState, OrchestratorError> {
        let mut state = self.get_task(task_id)?;
        if state.status != WorkflowStatus::AwaitingApproval {
            return Ok(state);
        }
        let request_id = state.approval_request_id.clone().ok_or_else(|| {
            OrchestratorError::Internal(format!("{task_id}: awaiting approval with no request_id"))
        })?;
        let request = self.hitl.get(&request_id)?;
        if !request.status.is_terminal() {
            return Ok(state);
        }

        let task = self
            .tasks
            .get(task_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| OrchestratorError::NotFound(task_id.to_string()))?;

        if request.status != crate::hitl::ApprovalStatus::Approved {
            state.status = WorkflowStatus::Rejected;
            state.approval_request_id = None;
            state.updated_at = Utc::now();
            self.workflows.insert(task_id.to_string(), state.clone());
            return Ok(state);
        }

        let target_node = state.node_name.clone();
        let thread_id = state.thread_id.clone();
        state.status = WorkflowStatus::Running;
        state.approval_request_id = None;

        let handle = self
            .lock_manager
            .acquire(
                Self::lock_resource(&thread_id),
                "engine",
                Duration::from_secs(self.settings.lock_default_ttl_seconds),
                Duration::ZERO,
                None,
            )
            .await?;
        let outcome = self
            .graph
            .resume_from(state, RunnableConfig::for_thread(thread_id), target_node)
            .await;
        handle.release().await;

        self.finish(task_id, &task, outcome)
    }

    /// `POST /tasks/{task_id}/cancel` (§6): rejects the pending approval, if any, and marks
    /// the workflow `Cancelled`. Best-effort when no node is currently suspended -- the
    /// Engine has no handle on an in-flight node execution to abort mid-run.
    pub async fn cancel(&self, task_id: &str, reason: &str) -> Result<WorkflowState, OrchestratorError> {
        let mut state = self.get_task(task_id)?;
        if state.status.is_terminal() {
            return Err(OrchestratorError::Conflict(format!("{task_id}: already terminal")));
        }

        if let Some(request_id) = state.approval_request_id.clone() {
            self.hitl
                .record_decision(&request_id, Decision::Cancelled, "system", Some(reason.to_string()))
                .await?;
        }

        state.status = WorkflowStatus::Cancelled;
        state.approval_request_id = None;
        state.error = Some(reason.to_string());
        state.updated_at = Utc::now();
        self.workflows.insert(task_id.to_string(), state.clone());
        Ok(state)
    }

    fn finish(
        &self,
        task_id: &str,
        task: &Task,
        outcome: Result<InvokeOutcome<WorkflowState>, OrchestratorError>,
    ) -> Result<WorkflowState, OrchestratorError> {
        match outcome {
            Ok(InvokeOutcome::Completed(mut state)) => {
                if !state.status.is_terminal() {
                    state.status = WorkflowStatus::Completed;
                    state.updated_at = Utc::now();
                }
                info!(task_id, status = ?state.status, "workflow run completed");
                self.workflows.insert(task_id.to_string(), state.clone());
                Ok(state)
            }
            Ok(InvokeOutcome::Suspended { state, .. }) => {
                info!(task_id, "workflow run suspended awaiting approval");
                self.workflows.insert(task_id.to_string(), state.clone());
                Ok(state)
            }
            Err(e) => {
                error!(task_id, error = %e, "workflow run failed");
                let mut state = self
                    .workflows
                    .get(task_id)
                    .map(|entry| entry.value().clone())
                    .unwrap_or_else(|| WorkflowState::new(task, uuid6().to_string(), self.graph.first_node_id().to_string()));
                state.fail(e.to_string());
                self.workflows.insert(task_id.to_string(), state);
                Err(e)
            }
        }
    }
}

struct ApprovalDecisionHandler(Arc<Engine>);

#[async_trait]
impl EventHandler for ApprovalDecisionHandler {
    async fn handle(&self, event: Event) {
        let Some(task_id) = event.payload.get("workflow_id").and_then(|v| v.as_str()) else {
            return;
        };
        if let Err(e) = self.0.resume(task_id).await {
            error!(task_id, error = %e, "approval_decision-triggered resume failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;

    use crate::config::ApprovalTimeouts;
    use crate::hitl::{NullApprovalUiClient, RiskRule};
    use crate::llm::MockLlm;
    use crate::memory::MemorySaver;
    use serde_json::Value;

    use super::*;

    struct EchoGateway;

    #[async_trait]
    impl ToolGatewayClient for EchoGateway {
        async fn invoke(&self, tool_name: &str, _arguments: &Value) -> Result<Value, OrchestratorError> {
            Ok(serde_json::json!({"artifact": format!("{tool_name}-ok")}))
        }
    }

    fn engine_with(llm: Arc<dyn LlmClient>) -> Arc<Engine> {
        let event_bus = EventBus::new("test-node");
        let lock_manager = LockManager::new(Some(Arc::clone(&event_bus)));
        let catalog = ToolCatalog::new(StdHashMap::new());
        // AgentNode::run_inner looks its profile up unconditionally; every specialist
        // registered below needs one or the node fails before it ever reaches the LLM.
        for agent_name in ["coder", "deployer"] {
            catalog.register_agent_profile(crate::catalog::AgentProfile {
                agent_name: agent_name.into(),
                model_hint: "gpt-4o-mini".into(),
                system_prompt: format!("You are the {agent_name} specialist."),
                allowed_servers: Default::default(),
                recommended_tools: Default::default(),
                temperature: 0.0,
            });
        }
        let hitl = HitlManager::new(
            RiskRule::default_table(),
            ApprovalTimeouts::default(),
            Arc::clone(&event_bus),
            Arc::clone(&lock_manager),
            Arc::new(NullApprovalUiClient),
        );
        let checkpointer: Arc<dyn Checkpointer<WorkflowState>> = Arc::new(MemorySaver::new());
        Engine::new(
            Settings::default(),
            event_bus,
            lock_manager,
            catalog,
            hitl,
            checkpointer,
            llm,
            Arc::new(EchoGateway),
            vec![
                SpecialistSpec { name: "coder".into(), capability: "writes code".into(), state_changing: false },
                SpecialistSpec { name: "deployer".into(), capability: "deploys services".into(), state_changing: true },
            ],
            "coder",
        )
    }

    #[tokio::test]
    async fn low_risk_task_completes_without_suspending() {
        let engine = engine_with(Arc::new(MockLlm::with_responses(vec![
            crate::llm::LlmResponse { content: "coder".into(), tool_calls: vec![], usage: None },
            crate::llm::LlmResponse { content: "patch applied".into(), tool_calls: vec![], usage: None },
        ])));
        let task = Task::new("t1", "fix the flaky login test");
        let state = engine.orchestrate(task).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn high_risk_routing_suspends_and_resume_requires_approval() {
        let engine = engine_with(Arc::new(MockLlm::with_responses(vec![
            crate::llm::LlmResponse { content: "deployer".into(), tool_calls: vec![], usage: None },
            crate::llm::LlmResponse { content: "deploy complete".into(), tool_calls: vec![], usage: None },
        ])));
        let mut task = Task::new("t1", "deploy the release to prod");
        task.context.insert("operation".into(), serde_json::json!("deploy"));
        task.context.insert("environment".into(), serde_json::json!("prod"));
        let state = engine.orchestrate(task).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::AwaitingApproval);

        let request_id = state.approval_request_id.clone().unwrap();
        // `record_decision` emits `approval_decision`, which the Engine's own subscription
        // handles by resuming the workflow before this call returns (the bus awaits each
        // subscriber to completion). The explicit `resume` below is then a no-op.
        engine.hitl.record_decision(&request_id, Decision::Approved, "lead", None).await.unwrap();

        let resumed = engine.resume("t1").await.unwrap();
        assert_eq!(resumed.status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn cancel_marks_a_suspended_workflow_cancelled() {
        let engine = engine_with(Arc::new(MockLlm::with_responses(vec![
            crate::llm::LlmResponse { content: "deployer".into(), tool_calls: vec![], usage: None },
        ])));
        let mut task = Task::new("t1", "delete the prod database");
        task.context.insert("operation".into(), serde_json::json!("delete"));
        task.context.insert("environment".into(), serde_json::json!("prod"));
        let state = engine.orchestrate(task).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::AwaitingApproval);

        let cancelled = engine.cancel("t1", "no longer needed").await.unwrap();
        assert_eq!(cancelled.status, WorkflowStatus::Cancelled);
    }
}

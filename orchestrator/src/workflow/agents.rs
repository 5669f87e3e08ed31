//! `AgentNode` (§4.6): the uniform specialist node. One struct, parameterized by
//! `agent_name`/`state_changing`, covers every specialist -- the catalog's `AgentProfile`
//! and per-task tool selection supply what differs between them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::catalog::ToolCatalog;
use crate::config::ToolStrategy;
use crate::error::{ErrorKind, OrchestratorError};
use crate::graph::{Next, Node, RetryPolicy};
use crate::llm::{LlmClient, LlmRequest};
use crate::message::Message;
use crate::tool_gateway::ToolGatewayClient;

use super::state::WorkflowState;

/// A specialist agent node: loads its `AgentProfile`, selects tools progressively, and
/// drives a bounded tool-call loop against the LLM and Tool Gateway (§4.6 steps 1-5).
pub struct AgentNode {
    agent_name: String,
    /// Whether this specialist's actions mutate external state and therefore must pass
    /// through the Approval Gate before running (wired into the graph, not the catalog --
    /// see DESIGN.md).
    pub state_changing: bool,
    catalog: Arc<ToolCatalog>,
    llm: Arc<dyn LlmClient>,
    tool_gateway: Arc<dyn ToolGatewayClient>,
    tool_strategy: ToolStrategy,
    max_tool_rounds: u32,
    node_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl AgentNode {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent_name: impl Into<String>,
        state_changing: bool,
        catalog: Arc<ToolCatalog>,
        llm: Arc<dyn LlmClient>,
        tool_gateway: Arc<dyn ToolGatewayClient>,
        tool_strategy: ToolStrategy,
        max_tool_rounds: u32,
        node_timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            state_changing,
            catalog,
            llm,
            tool_gateway,
            tool_strategy,
            max_tool_rounds,
            node_timeout,
            retry_policy,
        }
    }

    /// One LLM call, retried only for transient (`UpstreamUnavailable`) failures (§4.6
    /// "error handling": permanent errors -- validation, schema mismatch -- fail the node
    /// immediately instead of burning through the retry budget).
    async fn invoke_llm_with_retry(
        &self,
        request: LlmRequest<'_>,
    ) -> Result<crate::llm::LlmResponse, OrchestratorError> {
        let mut attempt = 0u32;
        loop {
            match self.llm.invoke(LlmRequest {
                system_prompt: request.system_prompt,
                messages: request.messages,
                tools: request.tools,
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            }).await {
                Ok(response) => return Ok(response),
                Err(e) if e.kind() == ErrorKind::UpstreamUnavailable => {
                    match self.retry_policy.delay_for_attempt(attempt) {
                        Some(delay) => {
                            attempt += 1;
                            warn!(agent = %self.agent_name, attempt, "transient LLM error, retrying");
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_inner(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), OrchestratorError> {
        let profile = self.catalog.agent_profile(&self.agent_name)?;
        let tools = self
            .catalog
            .select(&state.description, &self.agent_name, self.tool_strategy)?;
        state.tool_selection = tools.iter().map(|t| t.name.clone()).collect();

        let mut round = 0u32;
        loop {
            if round >= self.max_tool_rounds {
                return Err(OrchestratorError::Internal(format!(
                    "{}: exceeded max_tool_rounds ({})",
                    self.agent_name, self.max_tool_rounds
                )));
            }

            let response = self
                .invoke_llm_with_retry(LlmRequest {
                    system_prompt: &profile.system_prompt,
                    messages: &state.messages,
                    tools: &tools,
                    temperature: profile.temperature,
                    max_tokens: None,
                })
                .await?;

            if response.tool_calls.is_empty() {
                state.messages.push(Message::assistant(response.content.clone()));
                state
                    .artifacts
                    .insert(format!("{}_output", self.agent_name), Value::String(response.content));
                state.tool_round = round;
                return Ok((state, Next::Continue));
            }

            state
                .messages
                .push(Message::assistant_with_tool_calls(response.content, response.tool_calls.clone()));

            for call in &response.tool_calls {
                let arguments: Value = serde_json::from_str(&call.arguments).map_err(|e| {
                    OrchestratorError::Validation(format!(
                        "{}: malformed tool call arguments for {}: {e}",
                        self.agent_name, call.name
                    ))
                })?;
                let result = self.tool_gateway.invoke(&call.name, &arguments).await?;
                if let Some(artifact) = result.get("artifact") {
                    state.artifacts.insert(call.name.clone(), artifact.clone());
                }
                state.messages.push(Message::tool(call.id.clone(), call.name.clone(), result));
            }

            round += 1;
        }
    }
}

#[async_trait]
impl Node<WorkflowState> for AgentNode {
    fn id(&self) -> &str {
        &self.agent_name
    }

    async fn run(&self, state: WorkflowState) -> Result<(WorkflowState, Next), OrchestratorError> {
        match tokio::time::timeout(self.node_timeout, self.run_inner(state)).await {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::Timeout(format!(
                "{} exceeded node_timeout_seconds",
                self.agent_name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::catalog::{AgentProfile, ToolCatalog};
    use crate::llm::MockLlm;
    use crate::task::Task;
    use crate::tool_gateway::ToolGatewayClient;
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct EchoGateway;

    #[async_trait]
    impl ToolGatewayClient for EchoGateway {
        async fn invoke(&self, tool_name: &str, _arguments: &Value) -> Result<Value, OrchestratorError> {
            Ok(json!({"artifact": format!("{tool_name}-result")}))
        }
    }

    fn catalog_with_profile() -> Arc<ToolCatalog> {
        let catalog = ToolCatalog::new(HashMap::new());
        catalog.register_agent_profile(AgentProfile {
            agent_name: "coder".into(),
            model_hint: "gpt-4o-mini".into(),
            system_prompt: "you write code".into(),
            allowed_servers: Default::default(),
            recommended_tools: Default::default(),
            temperature: 0.0,
        });
        catalog
    }

    fn node(llm: Arc<dyn LlmClient>) -> AgentNode {
        AgentNode::new(
            "coder",
            false,
            catalog_with_profile(),
            llm,
            Arc::new(EchoGateway),
            ToolStrategy::Progressive,
            6,
            Duration::from_secs(5),
            RetryPolicy::None,
        )
    }

    #[tokio::test]
    async fn text_only_response_ends_the_node_and_writes_an_artifact() {
        let agent = node(Arc::new(MockLlm::with_text("patch applied")));
        let task = Task::new("t1", "fix the bug");
        let state = WorkflowState::new(&task, "thread-1", "coder");

        let (state, next) = agent.run(state).await.unwrap();
        assert!(matches!(next, Next::Continue));
        assert_eq!(state.artifacts.get("coder_output").unwrap(), "patch applied");
    }

    #[tokio::test]
    async fn tool_call_round_appends_tool_message_and_artifact() {
        let agent = node(Arc::new(MockLlm::with_one_tool_call_then_text(
            "run_tests",
            "{}",
            "tests pass",
        )));
        let task = Task::new("t1", "fix the bug");
        let state = WorkflowState::new(&task, "thread-1", "coder");

        let (state, _next) = agent.run(state).await.unwrap();
        assert!(state.artifacts.contains_key("run_tests"));
        assert!(matches!(state.messages.last(), Some(Message::Assistant { content, .. }) if content == "tests pass"));
    }

    #[tokio::test]
    async fn node_timeout_is_reported_as_timeout_error() {
        struct Never;
        #[async_trait]
        impl LlmClient for Never {
            async fn invoke(&self, _request: LlmRequest<'_>) -> Result<crate::llm::LlmResponse, OrchestratorError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                unreachable!()
            }
        }
        let agent = AgentNode::new(
            "coder",
            false,
            catalog_with_profile(),
            Arc::new(Never),
            Arc::new(EchoGateway),
            ToolStrategy::Progressive,
            6,
            Duration::from_millis(10),
            RetryPolicy::None,
        );
        let task = Task::new("t1", "fix the bug");
        let state = WorkflowState::new(&task, "thread-1", "coder");
        let result = agent.run(state).await;
        assert!(matches!(result, Err(OrchestratorError::Timeout(_))));
    }
}

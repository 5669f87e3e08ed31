//! `SupervisorNode` (§4.6): the graph's entry node. Routes a task to exactly one
//! specialist by asking the LLM to choose from a static index of known specialists.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::OrchestratorError;
use crate::graph::{Next, Node};
use crate::llm::{LlmClient, LlmRequest};
use crate::message::Message;

use super::state::WorkflowState;

/// One routable specialist, as surfaced to the Supervisor's prompt.
#[derive(Debug, Clone)]
pub struct SpecialistEntry {
    pub name: String,
    pub capability: String,
}

fn build_system_prompt(specialists: &[SpecialistEntry]) -> String {
    let mut prompt = String::from(
        "You are the supervisor of a development-automation workflow. \
         Read the task and reply with exactly one specialist name from this list, and nothing else:\n",
    );
    for specialist in specialists {
        prompt.push_str(&format!("- {}: {}\n", specialist.name, specialist.capability));
    }
    prompt
}

/// Picks the next node id out of the LLM's free-text reply: the first specialist name
/// that appears as a whole word, case-insensitively.
fn parse_choice(content: &str, specialists: &[SpecialistEntry]) -> Option<String> {
    let lowered = content.to_lowercase();
    specialists
        .iter()
        .find(|s| {
            lowered
                .split(|c: char| !c.is_alphanumeric() && c != '_' && c != '-')
                .any(|word| word == s.name.to_lowercase())
        })
        .map(|s| s.name.clone())
}

/// LLM-driven router over a fixed specialist index (§4.6 "Supervisor"). Falls back to
/// `default_specialist` with a logged warning when the LLM's reply can't be parsed.
pub struct SupervisorNode {
    specialists: Vec<SpecialistEntry>,
    default_specialist: String,
    system_prompt: String,
    llm: std::sync::Arc<dyn LlmClient>,
    timeout: Duration,
}

impl SupervisorNode {
    pub fn new(
        specialists: Vec<SpecialistEntry>,
        default_specialist: impl Into<String>,
        llm: std::sync::Arc<dyn LlmClient>,
        timeout: Duration,
    ) -> Self {
        let system_prompt = build_system_prompt(&specialists);
        Self {
            specialists,
            default_specialist: default_specialist.into(),
            system_prompt,
            llm,
            timeout,
        }
    }

    async fn run_inner(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), OrchestratorError> {
        let response = self
            .llm
            .invoke(LlmRequest {
                system_prompt: &self.system_prompt,
                messages: &state.messages,
                tools: &[],
                temperature: 0.0,
                max_tokens: Some(32),
            })
            .await?;

        let choice = parse_choice(&response.content, &self.specialists).unwrap_or_else(|| {
            warn!(reply = %response.content, "supervisor: unparseable routing reply, using default specialist");
            self.default_specialist.clone()
        });

        state.node_name = choice;
        state.messages.push(Message::assistant(response.content));
        Ok((state, Next::Continue))
    }
}

#[async_trait]
impl Node<WorkflowState> for SupervisorNode {
    fn id(&self) -> &str {
        "supervisor"
    }

    async fn run(&self, state: WorkflowState) -> Result<(WorkflowState, Next), OrchestratorError> {
        match tokio::time::timeout(self.timeout, self.run_inner(state)).await {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::Timeout("supervisor exceeded supervisor_timeout_seconds".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::llm::MockLlm;
    use crate::task::Task;

    use super::*;

    fn specialists() -> Vec<SpecialistEntry> {
        vec![
            SpecialistEntry { name: "coder".into(), capability: "writes and edits code".into() },
            SpecialistEntry { name: "tester".into(), capability: "runs test suites".into() },
        ]
    }

    #[tokio::test]
    async fn routes_to_the_specialist_named_in_the_reply() {
        let supervisor = SupervisorNode::new(
            specialists(),
            "coder",
            Arc::new(MockLlm::with_text("tester")),
            Duration::from_secs(5),
        );
        let task = Task::new("t1", "run the test suite");
        let state = WorkflowState::new(&task, "thread-1", "supervisor");
        let (state, _next) = supervisor.run(state).await.unwrap();
        assert_eq!(state.node_name, "tester");
    }

    #[tokio::test]
    async fn falls_back_to_default_on_unparseable_reply() {
        let supervisor = SupervisorNode::new(
            specialists(),
            "coder",
            Arc::new(MockLlm::with_text("I am not sure what to do")),
            Duration::from_secs(5),
        );
        let task = Task::new("t1", "something ambiguous");
        let state = WorkflowState::new(&task, "thread-1", "supervisor");
        let (state, _next) = supervisor.run(state).await.unwrap();
        assert_eq!(state.node_name, "coder");
    }
}

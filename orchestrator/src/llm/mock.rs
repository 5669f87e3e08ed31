//! Scripted LLM for tests: returns a queued sequence of `LlmResponse`s, one per call, so a
//! multi-round agent loop (tool calls, then a final text reply) can be exercised
//! deterministically.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::message::ToolCallRequest;

use super::{LlmClient, LlmRequest, LlmResponse};

pub struct MockLlm {
    responses: Mutex<VecDeque<LlmResponse>>,
}

impl MockLlm {
    pub fn with_responses(responses: Vec<LlmResponse>) -> Self {
        Self { responses: Mutex::new(responses.into_iter().collect()) }
    }

    /// A single plain-text completion with no tool calls (ends the agent loop immediately).
    pub fn with_text(content: impl Into<String>) -> Self {
        Self::with_responses(vec![LlmResponse { content: content.into(), tool_calls: vec![], usage: None }])
    }

    /// First call requests `tool_name`, second call returns `final_content` with no tool
    /// calls -- the shape of one round-trip through the Tool Gateway.
    pub fn with_one_tool_call_then_text(
        tool_name: impl Into<String>,
        arguments: impl Into<String>,
        final_content: impl Into<String>,
    ) -> Self {
        Self::with_responses(vec![
            LlmResponse {
                content: String::new(),
                tool_calls: vec![ToolCallRequest {
                    id: "call-1".into(),
                    name: tool_name.into(),
                    arguments: arguments.into(),
                }],
                usage: None,
            },
            LlmResponse { content: final_content.into(), tool_calls: vec![], usage: None },
        ])
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, _request: LlmRequest<'_>) -> Result<LlmResponse, OrchestratorError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OrchestratorError::Internal("MockLlm: no more scripted responses".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_request<'a>(messages: &'a [crate::message::Message]) -> LlmRequest<'a> {
        LlmRequest { system_prompt: "", messages, tools: &[], temperature: 0.0, max_tokens: None }
    }

    #[tokio::test]
    async fn with_text_returns_fixed_content_once() {
        let llm = MockLlm::with_text("hello");
        let resp = llm.invoke(empty_request(&[])).await.unwrap();
        assert_eq!(resp.content, "hello");
        assert!(resp.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn scripted_sequence_is_consumed_in_order() {
        let llm = MockLlm::with_one_tool_call_then_text("get_time", "{}", "the time is now");
        let first = llm.invoke(empty_request(&[])).await.unwrap();
        assert_eq!(first.tool_calls.len(), 1);
        assert_eq!(first.tool_calls[0].name, "get_time");

        let second = llm.invoke(empty_request(&[])).await.unwrap();
        assert_eq!(second.content, "the time is now");
        assert!(second.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn exhausted_mock_returns_internal_error() {
        let llm = MockLlm::with_text("once");
        let _ = llm.invoke(empty_request(&[])).await.unwrap();
        let err = llm.invoke(empty_request(&[])).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Internal(_)));
    }
}

//! Chat-completion client against an OpenAI-compatible API (§6 "LLM provider contract").
//! Requires `OPENAI_API_KEY` (or explicit config) and respects `OPENAI_BASE_URL` /
//! `OPENAI_API_BASE` for self-hosted/proxy endpoints.

use async_trait::async_trait;
use tracing::{debug, trace};

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCalls, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
        ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
        ChatCompletionTools, CreateChatCompletionRequestArgs, FunctionObject, ToolChoiceOptions,
    },
    Client,
};

use crate::error::OrchestratorError;
use crate::memory::uuid6;
use crate::message::{Message, ToolCallRequest};

use super::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ToolChoiceMode};

/// `ChatOpenAI`: the default real `LlmClient` implementation.
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    tool_choice: Option<ToolChoiceMode>,
}

impl ChatOpenAI {
    pub fn new(model: impl Into<String>) -> Self {
        Self { client: Client::new(), model: model.into(), tool_choice: None }
    }

    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self { client: Client::with_config(config), model: model.into(), tool_choice: None }
    }

    pub fn with_tool_choice(mut self, mode: ToolChoiceMode) -> Self {
        self.tool_choice = Some(mode);
        self
    }

    fn chat_completions_url() -> String {
        let base = std::env::var("OPENAI_BASE_URL")
            .or_else(|_| std::env::var("OPENAI_API_BASE"))
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let base = base.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn messages_to_request(system_prompt: &str, messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        let mut request = vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage::from(system_prompt),
        )];
        for message in messages {
            let entry = match message {
                Message::System { content } => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(content.as_str()),
                ),
                Message::User { content } => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(content.as_str()),
                ),
                Message::Assistant { content, .. } => {
                    ChatCompletionRequestMessage::Assistant(content.as_str().into())
                }
                Message::Tool { call_id, result, .. } => ChatCompletionRequestMessage::Tool(
                    ChatCompletionRequestToolMessage { content: result.to_string().into(), tool_call_id: call_id.clone() },
                ),
            };
            request.push(entry);
        }
        request
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(&self, request: LlmRequest<'_>) -> Result<LlmResponse, OrchestratorError> {
        let trace_id = uuid6().to_string();
        let openai_messages = Self::messages_to_request(request.system_prompt, request.messages);

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(openai_messages);
        args.temperature(request.temperature);
        if let Some(max_tokens) = request.max_tokens {
            args.max_tokens(max_tokens as u16);
        }

        if !request.tools.is_empty() {
            let chat_tools: Vec<ChatCompletionTools> = request
                .tools
                .iter()
                .map(|t| {
                    ChatCompletionTools::Function(ChatCompletionTool {
                        function: FunctionObject {
                            name: t.name.clone(),
                            description: Some(t.description.clone()),
                            parameters: Some(t.input_schema.clone()),
                            ..Default::default()
                        },
                    })
                })
                .collect();
            args.tools(chat_tools);
        }

        if let Some(mode) = self.tool_choice {
            let opt = match mode {
                ToolChoiceMode::Auto => ToolChoiceOptions::Auto,
                ToolChoiceMode::None => ToolChoiceOptions::None,
                ToolChoiceMode::Required => ToolChoiceOptions::Required,
            };
            args.tool_choice(ChatCompletionToolChoiceOption::Mode(opt));
        }

        let built = args
            .build()
            .map_err(|e| OrchestratorError::Internal(format!("OpenAI request build failed: {e}")))?;

        let url = Self::chat_completions_url();
        debug!(trace_id = %trace_id, url = %url, model = %self.model, message_count = request.messages.len(), tools_count = request.tools.len(), "OpenAI chat create");

        let response = self
            .client
            .chat()
            .create(built)
            .await
            .map_err(|e| OrchestratorError::UpstreamUnavailable(format!("OpenAI API error: {e}")))?;

        trace!(trace_id = %trace_id, url = %url, "OpenAI response received");

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OrchestratorError::UpstreamUnavailable("OpenAI returned no choices".into()))?;

        let msg = choice.message;
        let content = msg.content.unwrap_or_default();
        let tool_calls: Vec<ToolCallRequest> = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => Some(ToolCallRequest {
                    id: f.id,
                    name: f.function.name,
                    arguments: f.function.arguments,
                }),
                _ => None,
            })
            .collect();

        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse { content, tool_calls, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_openai_new_creates_client() {
        let _ = ChatOpenAI::new("gpt-4o-mini");
    }

    #[tokio::test]
    async fn invoke_against_unreachable_base_returns_upstream_unavailable() {
        let config = OpenAIConfig::new().with_api_key("test-key").with_api_base("https://127.0.0.1:1");
        let client = ChatOpenAI::with_config(config, "gpt-4o-mini");
        let messages = [Message::user("hello")];
        let request = LlmRequest {
            system_prompt: "you are helpful",
            messages: &messages,
            tools: &[],
            temperature: 0.0,
            max_tokens: None,
        };

        let result = client.invoke(request).await;
        assert!(matches!(result, Err(OrchestratorError::UpstreamUnavailable(_))));
    }
}

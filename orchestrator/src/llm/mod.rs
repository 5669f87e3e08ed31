//! LLM provider client abstraction (§6 "LLM provider contract"): a chat-completion call
//! accepting `(system_prompt, messages, tools[], temperature, max_tokens)` and returning
//! either a text completion or a list of tool-call instructions. No specific provider is
//! implied by the spec; `ChatOpenAI` implements it against an OpenAI-compatible API and
//! `MockLlm` drives tests.

mod mock;
mod openai;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::Tool;
use crate::error::OrchestratorError;
use crate::message::{Message, ToolCallRequest};

/// Tool choice mode for chat completions: when tools are present, controls whether the
/// model may choose (auto), must not use (none), or must use (required).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolChoiceMode {
    #[default]
    Auto,
    None,
    Required,
}

impl std::str::FromStr for ToolChoiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            "required" => Ok(Self::Required),
            _ => Err(format!("unknown tool_choice: {s} (use auto, none, or required)")),
        }
    }
}

/// Token usage for one completion, when the provider reports it.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from one chat-completion call: either plain text, or a list of tool calls the
/// agent node must execute before the round can continue (§4.6 step 4).
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Option<LlmUsage>,
}

/// One chat-completion request, bundled per the §6 contract tuple.
pub struct LlmRequest<'a> {
    pub system_prompt: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [Tool],
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// A chat-completion provider. Implementations: `MockLlm` (fixed/scripted responses for
/// tests), `ChatOpenAI` (a real OpenAI-compatible API).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, request: LlmRequest<'_>) -> Result<LlmResponse, OrchestratorError>;
}

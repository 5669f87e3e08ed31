//! Conversation message shape threaded through `WorkflowState.messages` (§3) and the LLM
//! provider contract (§6): system/user/assistant turns plus the tool-call/tool-result pairs
//! an agent node appends while it drives the Tool Gateway (§4.6 step 4).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One pending tool invocation requested by the LLM. `arguments` is carried as the raw
/// string the provider returned; the agent node parses it to JSON before calling the Tool
/// Gateway, surfacing a parse failure as a permanent (schema mismatch) node error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// A single turn in a workflow's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System { content: String },
    User { content: String },
    Assistant {
        content: String,
        #[serde(default)]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        call_id: String,
        name: String,
        result: Value,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant { content: content.into(), tool_calls: Vec::new() }
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Message::Assistant { content: content.into(), tool_calls }
    }

    pub fn tool(call_id: impl Into<String>, name: impl Into<String>, result: Value) -> Self {
        Message::Tool { call_id: call_id.into(), name: name.into(), result }
    }

    /// Plain-text content for providers/logs that only care about the text, not the
    /// structured tool fields.
    pub fn text(&self) -> &str {
        match self {
            Message::System { content } | Message::User { content } => content,
            Message::Assistant { content, .. } => content,
            Message::Tool { .. } => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_with_tool_calls_roundtrips_through_json() {
        let msg = Message::assistant_with_tool_calls(
            "checking",
            vec![ToolCallRequest { id: "c1".into(), name: "get_time".into(), arguments: "{}".into() }],
        );
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        match decoded {
            Message::Assistant { content, tool_calls } => {
                assert_eq!(content, "checking");
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].name, "get_time");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn tool_message_carries_structured_result() {
        let msg = Message::tool("c1", "get_time", json!({"epoch": 1}));
        assert!(matches!(msg, Message::Tool { ref result, .. } if result["epoch"] == 1));
    }

    #[test]
    fn text_is_empty_for_tool_messages() {
        let msg = Message::tool("c1", "get_time", json!(null));
        assert_eq!(msg.text(), "");
    }
}

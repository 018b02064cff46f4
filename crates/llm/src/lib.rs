//! LLM provider seam.
//!
//! Everything above this crate talks to a model through [`LlmClient`]; the
//! Gemini implementation is the production path and [`ScriptedLlm`] keeps
//! the controllers and tool services testable without a network or a
//! credential.

pub mod gemini;
pub mod scripted;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use gemini::GeminiClient;
pub use scripted::{ScriptedLlm, ScriptedReply};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing LLM credential")]
    MissingCredential,
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm provider returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("llm response was malformed: {0}")]
    MalformedResponse(String),
    #[error("scripted llm ran out of replies")]
    ScriptExhausted,
}

/// A tool the model may request, advertised as a function declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments.
    pub parameters: Value,
}

/// A tool call requested by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    /// All factotum tools take a single `question` string.
    pub fn question(&self) -> Option<&str> {
        self.arguments.get("question").and_then(Value::as_str)
    }
}

/// One entry in the conversation context sent to the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatMessage {
    User { text: String },
    Assistant { text: Option<String>, tool_calls: Vec<ToolCall> },
    /// A tool observation fed back into the reasoning loop. Failure text
    /// goes through the same channel as success payloads.
    ToolResult { call: ToolCall, output: String },
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::Assistant { text: Some(text.into()), tool_calls: Vec::new() }
    }
}

/// A completion request: system prompt, running context, and the tools the
/// model may call (empty when tool use is not wanted).
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
}

/// The model's reply: free text, tool calls, or both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LlmReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl LlmReply {
    pub fn wants_tool(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<LlmReply, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::{LlmReply, ToolCall};

    #[test]
    fn tool_call_exposes_question_argument() {
        let call = ToolCall {
            name: "company_database".to_string(),
            arguments: serde_json::json!({ "question": "list products" }),
        };
        assert_eq!(call.question(), Some("list products"));

        let missing = ToolCall { name: "company_database".to_string(), arguments: serde_json::json!({}) };
        assert_eq!(missing.question(), None);
    }

    #[test]
    fn reply_reports_tool_intent() {
        let direct = LlmReply { text: Some("done".to_string()), tool_calls: Vec::new() };
        assert!(!direct.wants_tool());

        let call = LlmReply {
            text: None,
            tool_calls: vec![ToolCall {
                name: "document_search".to_string(),
                arguments: serde_json::json!({ "question": "summarize" }),
            }],
        };
        assert!(call.wants_tool());
        assert_eq!(call.text_or_empty(), "");
    }
}

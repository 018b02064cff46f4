//! Deterministic [`LlmClient`] for tests and offline runs.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{ChatRequest, LlmClient, LlmError, LlmReply, ToolCall};

/// One pre-programmed reply.
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Text(String),
    ToolCall { name: String, question: String },
    Fail(String),
}

/// Replays a fixed script of replies in order and records every request it
/// received, so tests can assert on prompts and context growth.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<Vec<ScriptedReply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self { replies: Mutex::new(replies), requests: Mutex::new(Vec::new()) }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(vec![ScriptedReply::Text(text.to_string())])
    }

    /// Requests seen so far, oldest first.
    pub async fn seen_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining_replies(&self) -> usize {
        self.replies.lock().await.len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: ChatRequest) -> Result<LlmReply, LlmError> {
        self.requests.lock().await.push(request);

        let mut replies = self.replies.lock().await;
        if replies.is_empty() {
            return Err(LlmError::ScriptExhausted);
        }
        match replies.remove(0) {
            ScriptedReply::Text(text) => Ok(LlmReply { text: Some(text), tool_calls: Vec::new() }),
            ScriptedReply::ToolCall { name, question } => Ok(LlmReply {
                text: None,
                tool_calls: vec![ToolCall {
                    name,
                    arguments: serde_json::json!({ "question": question }),
                }],
            }),
            ScriptedReply::Fail(message) => Err(LlmError::Api { status: 500, message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ScriptedLlm, ScriptedReply};
    use crate::{ChatMessage, ChatRequest, LlmClient, LlmError};

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            system: String::new(),
            messages: vec![ChatMessage::user(text)],
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn replays_script_in_order() {
        let llm = ScriptedLlm::new(vec![
            ScriptedReply::ToolCall {
                name: "company_database".to_string(),
                question: "list products".to_string(),
            },
            ScriptedReply::Text("done".to_string()),
        ]);

        let first = llm.complete(request("q1")).await.unwrap();
        assert!(first.wants_tool());
        let second = llm.complete(request("q2")).await.unwrap();
        assert_eq!(second.text.as_deref(), Some("done"));
        assert_eq!(llm.seen_requests().await.len(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_is_an_error() {
        let llm = ScriptedLlm::answering("only once");
        llm.complete(request("q1")).await.unwrap();
        let result = llm.complete(request("q2")).await;
        assert!(matches!(result, Err(LlmError::ScriptExhausted)));
    }
}

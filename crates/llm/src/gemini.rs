//! Gemini `generateContent` client over plain HTTP.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use factotum_core::config::LlmConfig;

use crate::{ChatMessage, ChatRequest, LlmClient, LlmError, LlmReply, ToolCall};

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f64,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or(LlmError::MissingCredential)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: ChatRequest) -> Result<LlmReply, LlmError> {
        let body = GenerateContentRequest::from_chat(&request, self.temperature);
        debug!(model = %self.model, messages = request.messages.len(), "calling generateContent");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LlmError::Api { status: status.as_u16(), message });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|error| LlmError::MalformedResponse(error.to_string()))?;
        parsed.into_reply()
    }
}

// Wire types for the v1beta generateContent surface. Only the fields this
// client reads or writes are modeled.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDeclarations>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentRequest {
    fn from_chat(request: &ChatRequest, temperature: f64) -> Self {
        let system_instruction = (!request.system.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part { text: Some(request.system.clone()), ..Default::default() }],
        });

        let contents = request.messages.iter().map(content_from_message).collect();

        let tools = (!request.tools.is_empty()).then(|| {
            vec![ToolDeclarations {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|tool| FunctionDeclaration {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    })
                    .collect(),
            }]
        });

        Self {
            system_instruction,
            contents,
            tools,
            generation_config: GenerationConfig { temperature },
        }
    }
}

fn content_from_message(message: &ChatMessage) -> Content {
    match message {
        ChatMessage::User { text } => Content {
            role: Some("user".to_string()),
            parts: vec![Part { text: Some(text.clone()), ..Default::default() }],
        },
        ChatMessage::Assistant { text, tool_calls } => {
            let mut parts = Vec::new();
            if let Some(text) = text {
                parts.push(Part { text: Some(text.clone()), ..Default::default() });
            }
            for call in tool_calls {
                parts.push(Part {
                    function_call: Some(FunctionCall {
                        name: call.name.clone(),
                        args: call.arguments.clone(),
                    }),
                    ..Default::default()
                });
            }
            Content { role: Some("model".to_string()), parts }
        }
        ChatMessage::ToolResult { call, output } => Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                function_response: Some(FunctionResponse {
                    name: call.name.clone(),
                    response: serde_json::json!({ "content": output }),
                }),
                ..Default::default()
            }],
        },
    }
}

impl GenerateContentResponse {
    fn into_reply(self) -> Result<LlmReply, LlmError> {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| LlmError::MalformedResponse("no candidates in response".to_string()))?;

        let mut reply = LlmReply::default();
        let mut text_parts = Vec::new();
        for part in content.parts {
            if let Some(text) = part.text {
                text_parts.push(text);
            }
            if let Some(call) = part.function_call {
                reply.tool_calls.push(ToolCall { name: call.name, arguments: call.args });
            }
        }
        if !text_parts.is_empty() {
            reply.text = Some(text_parts.join("\n"));
        }
        if reply.text.is_none() && reply.tool_calls.is_empty() {
            return Err(LlmError::MalformedResponse(
                "candidate had neither text nor a function call".to_string(),
            ));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::{GenerateContentRequest, GenerateContentResponse};
    use crate::{ChatMessage, ChatRequest, LlmError, ToolCall, ToolSpec};

    fn request_fixture() -> ChatRequest {
        ChatRequest {
            system: "You are a helpful assistant.".to_string(),
            messages: vec![
                ChatMessage::user("How many employees are in engineering?"),
                ChatMessage::Assistant {
                    text: None,
                    tool_calls: vec![ToolCall {
                        name: "company_database".to_string(),
                        arguments: serde_json::json!({ "question": "engineering headcount" }),
                    }],
                },
                ChatMessage::ToolResult {
                    call: ToolCall {
                        name: "company_database".to_string(),
                        arguments: serde_json::json!({ "question": "engineering headcount" }),
                    },
                    output: "Columns: count\n2".to_string(),
                },
            ],
            tools: vec![ToolSpec {
                name: "company_database".to_string(),
                description: "Query the company database.".to_string(),
                parameters: serde_json::json!({ "type": "object" }),
            }],
        }
    }

    #[test]
    fn request_serializes_gemini_wire_shape() {
        let body = GenerateContentRequest::from_chat(&request_fixture(), 0.0);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You are a helpful assistant.");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["functionCall"]["name"], "company_database");
        assert_eq!(
            json["contents"][2]["parts"][0]["functionResponse"]["response"]["content"],
            "Columns: count\n2"
        );
        assert_eq!(
            json["tools"][0]["functionDeclarations"][0]["name"],
            "company_database"
        );
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn empty_tool_list_is_omitted() {
        let mut request = request_fixture();
        request.tools.clear();
        let json = serde_json::to_value(GenerateContentRequest::from_chat(&request, 0.0)).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn response_with_function_call_parses_to_tool_reply() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "document_search",
                            "args": { "question": "summarize the introduction" }
                        }
                    }]
                }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let reply = parsed.into_reply().unwrap();
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "document_search");
        assert_eq!(reply.tool_calls[0].question(), Some("summarize the introduction"));
    }

    #[test]
    fn response_with_text_parses_to_final_reply() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "There are 2 engineers." }] }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let reply = parsed.into_reply().unwrap();
        assert_eq!(reply.text.as_deref(), Some("There are 2 engineers."));
        assert!(!reply.wants_tool());
    }

    #[test]
    fn empty_candidates_are_malformed() {
        let parsed: GenerateContentResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(parsed.into_reply(), Err(LlmError::MalformedResponse(_))));
    }
}

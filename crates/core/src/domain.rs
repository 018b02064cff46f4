use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::ToolError;

/// Well-known tool names for the demo deployment. Discovery must yield
/// exactly these, and the crew planner's specialists bind to them.
pub const SQL_TOOL_NAME: &str = "company_database";
pub const DOC_TOOL_NAME: &str = "document_search";

/// A tool advertised by a tool service. Discovered once at agent startup
/// and immutable for the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON schema for the single-operation input.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// The canonical single-argument schema every factotum tool uses: one
    /// natural-language `question` string.
    pub fn question_schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "Natural-language question to answer"
                }
            },
            "required": ["question"]
        })
    }
}

/// Outcome of a single tool dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvocationOutcome {
    Payload(String),
    Failure(ToolError),
}

/// One dispatch from a controller to a tool service. Created per dispatch
/// and logged; never retried or deduplicated at this layer.
#[derive(Clone, Debug)]
pub struct ToolInvocation {
    pub id: Uuid,
    pub tool_name: String,
    pub question: String,
    pub outcome: InvocationOutcome,
    pub dispatched_at: DateTime<Utc>,
}

impl ToolInvocation {
    pub fn record(tool_name: &str, question: &str, outcome: InvocationOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool_name: tool_name.to_string(),
            question: question.to_string(),
            outcome,
            dispatched_at: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Payload(_))
    }
}

/// One user question through to one final answer, with the reasoning trace
/// accumulated along the way. Session-scoped, in-memory only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub trace: Vec<String>,
    pub answer: String,
}

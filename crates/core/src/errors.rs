use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classes for a tool dispatch, shared between the tool services,
/// their HTTP wire format, and the conversation controllers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool `{name}` is unreachable: {detail}")]
    Unreachable { name: String, detail: String },
    #[error("query generation failed: {0}")]
    QueryGeneration(String),
    #[error("no matching data: {0}")]
    EmptyResult(String),
    #[error("llm provider failure: {0}")]
    Provider(String),
}

/// Wire-level discriminant for [`ToolError`]. Serialized as the `kind`
/// field of an error payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    Unreachable,
    QueryGeneration,
    EmptyResult,
    Provider,
}

impl ToolError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            Self::Unreachable { .. } => ToolErrorKind::Unreachable,
            Self::QueryGeneration(_) => ToolErrorKind::QueryGeneration,
            Self::EmptyResult(_) => ToolErrorKind::EmptyResult,
            Self::Provider(_) => ToolErrorKind::Provider,
        }
    }

    /// Recoverable failures are fed back to the LLM as observations so it
    /// may reformulate within the same turn. Fatal failures end the turn.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::QueryGeneration(_) | Self::EmptyResult(_))
    }

    /// Reassemble a [`ToolError`] from its wire representation.
    pub fn from_wire(kind: ToolErrorKind, tool_name: &str, message: String) -> Self {
        match kind {
            ToolErrorKind::Unreachable => {
                Self::Unreachable { name: tool_name.to_string(), detail: message }
            }
            ToolErrorKind::QueryGeneration => Self::QueryGeneration(message),
            ToolErrorKind::EmptyResult => Self::EmptyResult(message),
            ToolErrorKind::Provider => Self::Provider(message),
        }
    }
}

//! HTTP contract shared by the tool services and the agent-side client.
//!
//! Discovery is `GET /tools`; invocation is `POST /tools/{name}/invoke`.
//! Tool-level failures travel in-band as a classified error payload with a
//! 200 status, so the transport layer only signals transport problems.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use factotum_core::domain::ToolDescriptor;
use factotum_core::errors::{ToolError, ToolErrorKind};

/// The single operation every tool exposes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub question: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvokeResponse {
    Ok { result: String },
    Error { kind: ToolErrorKind, message: String },
}

impl InvokeResponse {
    pub fn from_outcome(outcome: Result<String, ToolError>) -> Self {
        match outcome {
            Ok(result) => Self::Ok { result },
            Err(error) => Self::Error { kind: error.kind(), message: error.to_string() },
        }
    }

    pub fn into_outcome(self, tool_name: &str) -> Result<String, ToolError> {
        match self {
            Self::Ok { result } => Ok(result),
            Self::Error { kind, message } => Err(ToolError::from_wire(kind, tool_name, message)),
        }
    }
}

/// Server-side face of one tool: the descriptor it advertises and the
/// operation behind it.
#[async_trait]
pub trait ToolService: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    async fn answer(&self, question: &str) -> Result<String, ToolError>;
}

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use factotum_core::config::PlannerKind;
use factotum_llm::{LlmClient, LlmError};

use crate::conversation::ConversationContext;
use crate::crew::CrewPlanner;
use crate::planner::SequentialPlanner;
use crate::tools::ToolRegistry;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("llm provider failure: {0}")]
    Llm(#[from] LlmError),
}

/// One strategy for turning a user question into a final answer. Both
/// implementations are synchronous within a turn: they await each LLM
/// call and each tool dispatch before moving on.
#[async_trait]
pub trait ConversationController: Send + Sync {
    async fn handle_turn(
        &self,
        ctx: &mut ConversationContext,
        question: &str,
    ) -> Result<String, ControllerError>;
}

/// Build the controller selected by configuration.
pub fn build_controller(
    kind: PlannerKind,
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    max_tool_rounds: u32,
    trace_reasoning: bool,
) -> Box<dyn ConversationController> {
    match kind {
        PlannerKind::Sequential => {
            Box::new(SequentialPlanner::new(llm, registry, max_tool_rounds, trace_reasoning))
        }
        PlannerKind::Crew => Box::new(CrewPlanner::new(llm, registry)),
    }
}

//! Agent controllers - the "brains" that route a user question to a tool
//! and assemble the final answer.
//!
//! Two interchangeable strategies implement [`ConversationController`]:
//!
//! 1. **Sequential planner** (`planner`) - a small state machine: the LLM
//!    reasons over the conversation, optionally requests tool calls, and
//!    emits the final answer when it has enough context.
//! 2. **Crew planner** (`crew`) - a manager role delegates the question to
//!    exactly one of two specialists, each with exclusive access to one
//!    tool, and aggregates the specialist's draft.
//!
//! Both dispatch through the same [`Tool`] capability interface, bound at
//! startup from the tool services' advertised descriptors. The LLM never
//! touches a store directly; every fact flows through a tool observation.

pub mod controller;
pub mod conversation;
pub mod crew;
pub mod planner;
pub mod tools;

pub use controller::{build_controller, ConversationController, ControllerError};
pub use conversation::{is_exit_sentinel, ConversationContext, EXIT_SENTINEL};
pub use crew::CrewPlanner;
pub use planner::SequentialPlanner;
pub use tools::{RegistryError, Tool, ToolRegistry};

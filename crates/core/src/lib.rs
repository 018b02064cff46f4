pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;

pub use config::{AppConfig, ConfigError, LoadOptions, PlannerKind};
pub use logging::init_logging;
pub use domain::{
    ConversationTurn, InvocationOutcome, ToolDescriptor, ToolInvocation, DOC_TOOL_NAME,
    SQL_TOOL_NAME,
};
pub use errors::{ToolError, ToolErrorKind};

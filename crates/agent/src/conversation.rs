use factotum_core::domain::ConversationTurn;
use factotum_llm::ChatMessage;

/// Submitting this (case-insensitively) ends the interactive session
/// without invoking any tool.
pub const EXIT_SENTINEL: &str = "exit";

pub fn is_exit_sentinel(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(EXIT_SENTINEL)
}

/// Append-only conversation state for one session, threaded explicitly
/// through each turn. Nothing here survives the process.
#[derive(Default)]
pub struct ConversationContext {
    messages: Vec<ChatMessage>,
    turns: Vec<ConversationTurn>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn record_turn(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }
}

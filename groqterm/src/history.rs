use crate::types::ChatMessage;

/// Maximum number of turns kept in a conversation (ten exchanges).
pub const HISTORY_LIMIT: usize = 20;

/// Conversation turns sent along with each request of an interactive session.
///
/// Truncation is purely positional: once the limit is exceeded the oldest
/// turns are dropped, including a leading system turn.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// History seeded with a system prompt at index 0.
    pub fn with_system(prompt: Option<&str>) -> Self {
        let mut history = Self::new();
        if let Some(prompt) = prompt {
            history.messages.push(ChatMessage::system(prompt));
        }
        history
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.truncate();
    }

    /// Record a completed user/assistant exchange.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(ChatMessage::user(user));
        self.messages.push(ChatMessage::assistant(assistant));
        self.truncate();
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn truncate(&mut self) {
        if self.messages.len() > HISTORY_LIMIT {
            let excess = self.messages.len() - HISTORY_LIMIT;
            self.messages.drain(..excess);
        }
    }
}

use crate::state::{ChatMessage, ChatRole};

/// Ordered, append-only list of chat messages for one session.
///
/// No alternation between roles is enforced: a failed request can leave two
/// assistant messages in a row.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: ChatRole, content: impl Into<String>) -> &ChatMessage {
        self.messages.push(ChatMessage::new(role, content));
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

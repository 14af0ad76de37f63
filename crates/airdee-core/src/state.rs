//! UI-agnostic chat message types
//!
//! Shared by the terminal front end and the HTTP server; nothing here depends
//! on a UI framework.

use crate::render::render_message_html;
use crate::sanitize::escape_html;
use serde::{Deserialize, Serialize};

/// A chat message in the conversation.
///
/// Assistant messages are rendered once, when they are created. User messages
/// are stored raw and escaped when displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub raw_text: String,
    pub rendered_html: Option<String>,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn new(role: ChatRole, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let rendered_html = match role {
            ChatRole::Assistant => Some(render_message_html(&raw_text)),
            ChatRole::User => None,
        };
        Self {
            role,
            raw_text,
            rendered_html,
        }
    }

    /// HTML to place inside the message container.
    pub fn display_html(&self) -> String {
        match &self.rendered_html {
            Some(html) => html.clone(),
            None => escape_html(&self.raw_text),
        }
    }
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

//! Transport-neutral chat message shapes.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::command::ChatId;

/// An inbound chat message as seen by intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// User id of the sender.
    pub sender_id: i64,
    /// Conversation the message was posted in.
    pub chat_id: ChatId,
    /// Message text; absent for stickers, photos, and similar.
    pub text: Option<String>,
}

/// Destination of an outbound message: a numeric chat id or `@username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatTarget {
    /// Numeric chat identifier.
    Id(ChatId),
    /// Public channel or group username, e.g. `@my_channel`.
    Username(String),
}

impl From<ChatId> for ChatTarget {
    fn from(id: ChatId) -> Self {
        Self::Id(id)
    }
}

impl Display for ChatTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "{name}"),
        }
    }
}

/// Text rendering requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    /// Sent as-is.
    #[default]
    Plain,
    /// Telegram legacy Markdown.
    Markdown,
}

/// A message to be delivered by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Destination chat.
    pub chat: ChatTarget,
    /// Body text.
    pub text: String,
    /// Rendering mode.
    pub format: MessageFormat,
}

impl OutgoingMessage {
    /// Create a plain-text message.
    pub fn plain(chat: impl Into<ChatTarget>, text: impl Into<String>) -> Self {
        Self {
            chat: chat.into(),
            text: text.into(),
            format: MessageFormat::Plain,
        }
    }

    /// Create a Markdown-formatted message.
    pub fn markdown(chat: impl Into<ChatTarget>, text: impl Into<String>) -> Self {
        Self {
            chat: chat.into(),
            text: text.into(),
            format: MessageFormat::Markdown,
        }
    }
}

//! Bot API wire types. Only the fields the relay reads are modelled.

use serde::{Deserialize, Serialize};

use crate::models::chat::{ChatMessage, ChatTarget, MessageFormat};

/// Envelope wrapping every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Payload on success.
    pub result: Option<T>,
    /// Human-readable failure description.
    pub description: Option<String>,
    /// Error code mirroring the HTTP status.
    pub error_code: Option<u16>,
    /// Extra failure hints.
    pub parameters: Option<ResponseParameters>,
}

/// Failure hints attached to an unsuccessful response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before retrying after flood control.
    pub retry_after: Option<u64>,
}

/// One incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier used for the poll offset.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    pub message: Option<Message>,
}

/// Subset of the Bot API `Message` object.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Sender; absent for channel posts.
    pub from: Option<User>,
    /// Conversation the message belongs to.
    pub chat: Chat,
    /// UTF-8 text for text messages.
    pub text: Option<String>,
}

/// Subset of the Bot API `User` object.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: i64,
}

/// Subset of the Bot API `Chat` object.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Unique chat identifier.
    pub id: i64,
}

impl Message {
    /// Convert into the transport-neutral intake shape.
    ///
    /// Returns `None` for messages without a sender.
    #[must_use]
    pub fn into_chat_message(self) -> Option<ChatMessage> {
        let sender = self.from?;
        Some(ChatMessage {
            sender_id: sender.id,
            chat_id: self.chat.id,
            text: self.text,
        })
    }
}

/// Body for `getUpdates`.
#[derive(Debug, Clone, Serialize)]
pub struct GetUpdatesRequest {
    /// First update id to return.
    pub offset: i64,
    /// Long-poll timeout in seconds.
    pub timeout: u64,
    /// Update kinds to receive.
    pub allowed_updates: Vec<&'static str>,
}

/// Body for `sendMessage`.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    /// Destination chat.
    pub chat_id: &'a ChatTarget,
    /// Message text.
    pub text: &'a str,
    /// `Markdown` when formatting is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
}

/// Bot API `parse_mode` value for a format.
#[must_use]
pub fn parse_mode(format: MessageFormat) -> Option<&'static str> {
    match format {
        MessageFormat::Plain => None,
        MessageFormat::Markdown => Some("Markdown"),
    }
}

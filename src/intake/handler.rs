//! Operator chat intake.
//!
//! Runs every inbound chat message through a short, terminal state
//! machine: operator check, slash-prefix filter, help, validation, and
//! finally enqueue. The result is an [`IntakeOutcome`] from which the
//! reply (if any) is derived, so the caller decides how to deliver it.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::intake::replies;
use crate::intake::validator::{self, Rejection};
use crate::models::chat::{ChatMessage, OutgoingMessage};
use crate::models::command::{normalize_token, Command, CommandIds, CommandKind};
use crate::queue::CommandQueue;

/// Slash tokens answered with the help text instead of a command.
const HELP_TOKENS: [&str; 2] = ["/start", "/help"];

/// Terminal state reached by one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    /// Sender is not the operator. Nothing was queued.
    PermissionDenied,
    /// No text, or text without the `/` prefix. No reply is sent.
    Ignored,
    /// `/start` or `/help`.
    Help,
    /// Command validated and queued.
    Accepted {
        /// Verb the operator used.
        kind: CommandKind,
        /// The queued command.
        command: Command,
    },
    /// Known command with unusable arguments. Nothing was queued.
    Rejected {
        /// Verb the operator used.
        kind: CommandKind,
        /// Why the arguments were refused.
        rejection: Rejection,
    },
    /// Slash token that names no command. Nothing was queued.
    Unknown,
}

impl IntakeOutcome {
    /// Reply to send back to `message.chat_id`, if any.
    #[must_use]
    pub fn reply(&self, message: &ChatMessage) -> Option<OutgoingMessage> {
        let chat = message.chat_id;
        match self {
            Self::Ignored => None,
            Self::PermissionDenied => Some(OutgoingMessage::plain(chat, replies::PERMISSION_DENIED)),
            Self::Help => Some(OutgoingMessage::markdown(chat, replies::HELP_TEXT)),
            Self::Accepted { kind, command } => Some(OutgoingMessage::plain(
                chat,
                replies::accepted(*kind, &command.action),
            )),
            Self::Rejected { kind, rejection } => Some(OutgoingMessage::plain(
                chat,
                replies::rejected(*kind, *rejection),
            )),
            Self::Unknown => Some(OutgoingMessage::plain(chat, replies::UNKNOWN_COMMAND)),
        }
    }
}

/// Validates operator messages and feeds the command queue.
#[derive(Debug)]
pub struct IntakeHandler {
    config: Arc<GlobalConfig>,
    queue: Arc<CommandQueue>,
    ids: CommandIds,
}

impl IntakeHandler {
    /// Create a handler sharing the process-wide queue.
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>, queue: Arc<CommandQueue>) -> Self {
        Self {
            config,
            queue,
            ids: CommandIds::default(),
        }
    }

    /// Process one inbound message.
    ///
    /// Only [`IntakeOutcome::Accepted`] touches the queue.
    pub fn handle(&self, message: &ChatMessage) -> IntakeOutcome {
        if let Err(err) = self.config.ensure_operator(message.sender_id) {
            warn!(sender_id = message.sender_id, chat_id = message.chat_id, %err, "rejected chat sender");
            return IntakeOutcome::PermissionDenied;
        }

        let Some(text) = message.text.as_deref().filter(|t| t.starts_with('/')) else {
            return IntakeOutcome::Ignored;
        };

        let (token, raw_args) = split_command(text);
        if HELP_TOKENS.contains(&normalize_token(token).as_str()) {
            return IntakeOutcome::Help;
        }

        let Some(kind) = CommandKind::from_token(token) else {
            info!(token, "unknown command");
            return IntakeOutcome::Unknown;
        };

        match validator::validate_kind(kind, raw_args) {
            Ok(action) => {
                let command = Command::new(action, self.ids.next(), message.chat_id);
                self.queue.enqueue(command.clone());
                info!(
                    command_id = command.id,
                    kind = kind.token(),
                    action = ?command.action,
                    chat_id = command.origin_channel,
                    pending = self.queue.len(),
                    "command queued"
                );
                IntakeOutcome::Accepted { kind, command }
            }
            Err(rejection) => {
                info!(kind = kind.token(), %rejection, "command rejected");
                IntakeOutcome::Rejected { kind, rejection }
            }
        }
    }
}

/// Split `/token rest of text` at the first whitespace run.
fn split_command(text: &str) -> (&str, &str) {
    text.split_once(char::is_whitespace).unwrap_or((text, ""))
}

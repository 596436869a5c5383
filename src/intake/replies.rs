//! Operator-facing reply texts.

use crate::intake::validator::Rejection;
use crate::models::command::{Action, CommandKind, VALUE_RANGE};

/// Command grammar shown for `/start` and `/help`. Telegram Markdown.
pub const HELP_TEXT: &str = "\u{1f3ae} *Game Server Manager*\n\n\
    \u{1f4e2} */announce [text]* - Global message\n\
    \u{1f462} */kickall [reason]* - Kick all players\n\
    \u{1f4a8} */speed [value]* - Change speed (default: 16)\n\
    \u{1f30d} */gravity [value]* - Change gravity (default: 196)\n\
    \u{1f504} */resetspeed* - Reset speed\n\
    \u{1f504} */resetgravity* - Reset gravity\n\
    \u{1f465} */players* - List players\n\
    \u{1f527} */shutdown* - Shut the server down\n\
    \u{1f4ca} */status* - Server status";

/// Reply for senders other than the operator.
pub const PERMISSION_DENIED: &str = "\u{274c} You are not allowed to use this bot.";

/// Reply for unrecognized slash commands.
pub const UNKNOWN_COMMAND: &str = "\u{2753} Unknown command. Use /help";

/// Confirmation for an accepted command, echoing what was queued.
#[must_use]
pub fn accepted(kind: CommandKind, action: &Action) -> String {
    match (kind, action) {
        (_, Action::Announce { message }) => {
            format!("\u{2705} Global message sent: \"{message}\"")
        }
        (_, Action::KickAll { reason }) => {
            format!("\u{2705} All players will be kicked. Reason: \"{reason}\"")
        }
        (CommandKind::ResetSpeed, Action::Speed { value }) => {
            format!("\u{2705} Speed reset to {value}")
        }
        (_, Action::Speed { value }) => format!("\u{2705} Speed set to {value}"),
        (CommandKind::ResetGravity, Action::Gravity { value }) => {
            format!("\u{2705} Gravity reset to {value}")
        }
        (_, Action::Gravity { value }) => format!("\u{2705} Gravity set to {value}"),
        (_, Action::GetPlayers) => "\u{1f4cb} Player list requested...".to_owned(),
        (_, Action::Shutdown) => "\u{1f534} The server will be shut down!".to_owned(),
        (_, Action::GetStatus) => "\u{1f4ca} Status requested...".to_owned(),
    }
}

/// Error reply for a rejected command.
#[must_use]
pub fn rejected(kind: CommandKind, rejection: Rejection) -> String {
    let (low, high) = (VALUE_RANGE.start(), VALUE_RANGE.end());
    match (kind, rejection) {
        (_, Rejection::UnknownCommand) => UNKNOWN_COMMAND.to_owned(),
        (CommandKind::Announce, Rejection::MissingArgument) => {
            "\u{274c} Provide the message text!".to_owned()
        }
        (CommandKind::SetSpeed, Rejection::InvalidNumber) => {
            format!("\u{274c} Provide a valid speed value ({low}-{high})!")
        }
        (CommandKind::SetGravity, Rejection::InvalidNumber) => {
            format!("\u{274c} Provide a valid gravity value ({low}-{high})!")
        }
        (_, other) => format!("\u{274c} Cannot run {}: {other}", kind.token()),
    }
}

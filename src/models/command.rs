//! Command model shared by intake, the delivery queue, and the HTTP surface.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Telegram chat identifier a command originated from.
pub type ChatId = i64;

/// Speed restored by `/resetspeed`. The game server applies it unchecked.
pub const DEFAULT_SPEED: f64 = 16.0;

/// Gravity restored by `/resetgravity`. The game server applies it unchecked.
pub const DEFAULT_GRAVITY: f64 = 196.0;

/// Reason used by `/kickall` when the operator gives none.
pub const DEFAULT_KICK_REASON: &str = "Kicked by admin";

/// Inclusive bounds for numeric command values.
pub const VALUE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=1000.0;

/// Operator-facing command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `/announce <text>`: global message.
    Announce,
    /// `/kickall [reason]`: kick every player.
    KickAll,
    /// `/speed <value>`: set walk speed.
    SetSpeed,
    /// `/gravity <value>`: set gravity.
    SetGravity,
    /// `/resetspeed`: restore [`DEFAULT_SPEED`].
    ResetSpeed,
    /// `/resetgravity`: restore [`DEFAULT_GRAVITY`].
    ResetGravity,
    /// `/players`: request the player list.
    ListPlayers,
    /// `/shutdown`: stop the game server.
    Shutdown,
    /// `/status`: request server status.
    GetStatus,
}

impl CommandKind {
    /// Every kind, in help-text order.
    pub const ALL: [Self; 9] = [
        Self::Announce,
        Self::KickAll,
        Self::SetSpeed,
        Self::SetGravity,
        Self::ResetSpeed,
        Self::ResetGravity,
        Self::ListPlayers,
        Self::Shutdown,
        Self::GetStatus,
    ];

    /// Slash token the operator types, e.g. `/speed`.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Announce => "/announce",
            Self::KickAll => "/kickall",
            Self::SetSpeed => "/speed",
            Self::SetGravity => "/gravity",
            Self::ResetSpeed => "/resetspeed",
            Self::ResetGravity => "/resetgravity",
            Self::ListPlayers => "/players",
            Self::Shutdown => "/shutdown",
            Self::GetStatus => "/status",
        }
    }

    /// Resolve a slash token to a kind.
    ///
    /// Matching is case-insensitive and ignores a `@BotName` suffix, which
    /// Telegram appends when a command is picked from a group's menu.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let bare = normalize_token(token);
        Self::ALL.into_iter().find(|kind| kind.token() == bare)
    }
}

/// Lowercase a slash token and strip any `@BotName` suffix.
#[must_use]
pub fn normalize_token(token: &str) -> String {
    let bare = token.split_once('@').map_or(token, |(head, _)| head);
    bare.to_lowercase()
}

/// Wire-level instruction for the game server, tagged by `type`.
///
/// Reset commands collapse into [`Action::Speed`] / [`Action::Gravity`]
/// carrying the fixed default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Broadcast a message to all players.
    Announce {
        /// Message text, verbatim.
        message: String,
    },
    /// Kick every connected player.
    #[serde(rename = "kickall")]
    KickAll {
        /// Kick reason shown to players.
        reason: String,
    },
    /// Set walk speed.
    Speed {
        /// New speed, within [`VALUE_RANGE`].
        value: f64,
    },
    /// Set workspace gravity.
    Gravity {
        /// New gravity, within [`VALUE_RANGE`].
        value: f64,
    },
    /// Report connected players back via the callback endpoint.
    #[serde(rename = "getplayers")]
    GetPlayers,
    /// Shut the server down.
    Shutdown,
    /// Report server status back via the callback endpoint.
    #[serde(rename = "getstatus")]
    GetStatus,
}

/// A validated command waiting for the game server to poll it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// What the game server should do.
    #[serde(flatten)]
    pub action: Action,
    /// Issuance identifier; see [`CommandIds`].
    pub id: u64,
    /// Chat the command came from, so replies can be routed back.
    #[serde(rename = "chatId")]
    pub origin_channel: ChatId,
}

impl Command {
    /// Construct a command from a validated action.
    #[must_use]
    pub fn new(action: Action, id: u64, origin_channel: ChatId) -> Self {
        Self {
            action,
            id,
            origin_channel,
        }
    }
}

/// Timestamp-derived command id generator.
///
/// Ids are Unix milliseconds, bumped past the previous id when the clock
/// has not advanced, so they strictly increase within one process. They
/// may repeat across restarts if the wall clock moves backwards.
#[derive(Debug, Default)]
pub struct CommandIds {
    last: AtomicU64,
}

impl CommandIds {
    /// Issue the next id from the current wall clock.
    pub fn next(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_at(now)
    }

    /// Issue the next id given the current time in milliseconds.
    pub fn next_at(&self, now_millis: u64) -> u64 {
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_millis.max(prev.saturating_add(1));
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

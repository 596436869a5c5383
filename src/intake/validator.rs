//! Operator command validation.
//!
//! Turns a slash token and its raw argument text into a typed
//! [`Action`], or a [`Rejection`] describing why it cannot be queued.
//! Pure: no I/O, no queue access.

use std::fmt::{Display, Formatter};

use crate::models::command::{
    Action, CommandKind, DEFAULT_GRAVITY, DEFAULT_KICK_REASON, DEFAULT_SPEED, VALUE_RANGE,
};

/// Why operator input was not turned into a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The slash token names no known command.
    UnknownCommand,
    /// A required free-text argument was empty.
    MissingArgument,
    /// A numeric argument did not parse, was not finite, or was out of range.
    InvalidNumber,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MissingArgument => write!(f, "missing argument"),
            Self::InvalidNumber => write!(f, "invalid number"),
        }
    }
}

/// Validate a slash token and its argument text.
///
/// # Errors
///
/// Returns [`Rejection::UnknownCommand`] for unrecognized tokens, and
/// whatever [`validate_kind`] rejects for recognized ones.
pub fn validate(kind: &str, raw_args: &str) -> Result<Action, Rejection> {
    let kind = CommandKind::from_token(kind).ok_or(Rejection::UnknownCommand)?;
    validate_kind(kind, raw_args)
}

/// Validate argument text for an already-resolved kind.
///
/// # Errors
///
/// Returns [`Rejection::MissingArgument`] when `/announce` has no text and
/// [`Rejection::InvalidNumber`] when the argument of `/speed` or
/// `/gravity` does not start with a finite number in `0..=1000`.
pub fn validate_kind(kind: CommandKind, raw_args: &str) -> Result<Action, Rejection> {
    let args = raw_args.trim();
    match kind {
        CommandKind::Announce => {
            if args.is_empty() {
                Err(Rejection::MissingArgument)
            } else {
                Ok(Action::Announce {
                    message: args.to_owned(),
                })
            }
        }
        CommandKind::KickAll => {
            let reason = if args.is_empty() {
                DEFAULT_KICK_REASON
            } else {
                args
            };
            Ok(Action::KickAll {
                reason: reason.to_owned(),
            })
        }
        CommandKind::SetSpeed => parse_value(args).map(|value| Action::Speed { value }),
        CommandKind::SetGravity => parse_value(args).map(|value| Action::Gravity { value }),
        CommandKind::ResetSpeed => Ok(Action::Speed {
            value: DEFAULT_SPEED,
        }),
        CommandKind::ResetGravity => Ok(Action::Gravity {
            value: DEFAULT_GRAVITY,
        }),
        CommandKind::ListPlayers => Ok(Action::GetPlayers),
        CommandKind::Shutdown => Ok(Action::Shutdown),
        CommandKind::GetStatus => Ok(Action::GetStatus),
    }
}

/// Read the leading number of `args` and range-check it.
///
/// Anything after the number is ignored, so `50 fast` reads as 50.
fn parse_value(args: &str) -> Result<f64, Rejection> {
    let number = leading_number(args).ok_or(Rejection::InvalidNumber)?;
    let value: f64 = number.parse().map_err(|_| Rejection::InvalidNumber)?;
    if value.is_finite() && VALUE_RANGE.contains(&value) {
        // Folds -0 into +0.
        Ok(value + 0.0)
    } else {
        Err(Rejection::InvalidNumber)
    }
}

/// Longest prefix of `args` shaped like a decimal float:
/// `[+-]digits[.digits][(e|E)[+-]digits]`, with at least one mantissa digit.
fn leading_number(args: &str) -> Option<&str> {
    let bytes = args.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    // An exponent counts only when it has digits; `1e` reads as 1.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    Some(&args[..end])
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

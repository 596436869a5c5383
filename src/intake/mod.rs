//! Operator command intake: validation, reply texts, and the intake state machine.

pub mod handler;
pub mod replies;
pub mod validator;

pub use handler::{IntakeHandler, IntakeOutcome};

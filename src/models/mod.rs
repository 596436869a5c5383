//! Domain model module declarations.

pub mod chat;
pub mod command;
